//! Block terminators.
//!
//! Every basic block ends with exactly one [`Terminator`]. Only [`Ret`]
//! leaves the function; the other variants transfer control inside it or
//! abort execution.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::modules::{
    Module,
    operand::{Label, Operand},
};

/// Conditional branch
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CBranch {
    /// `i1` condition.
    pub cond: Operand,
    pub target_true: Label,
    pub target_false: Label,
}

/// Unconditional jump
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jump {
    pub target: Label,
}

/// Return from the function, `value` is `None` for `void`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ret {
    pub value: Option<Operand>,
}

/// Unrecoverable error, execution stops here.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trap;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Terminator {
    CBranch(CBranch),
    Jump(Jump),
    Ret(Ret),
    Trap(Trap),
}

impl Terminator {
    /// `true` for terminators that hand control back to the caller.
    #[inline]
    pub fn is_return(&self) -> bool {
        self.is_ret()
    }

    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            terminator: &'a Terminator,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.terminator {
                    Terminator::CBranch(cbranch) => write!(
                        f,
                        "branch {}, {:#}, {:#}",
                        cbranch.cond.fmt(self.module),
                        cbranch.target_true,
                        cbranch.target_false
                    ),
                    Terminator::Jump(jump) => write!(f, "jump {:#}", jump.target),
                    Terminator::Ret(Ret { value: Some(value) }) => {
                        write!(f, "ret {}", value.fmt(self.module))
                    }
                    Terminator::Ret(Ret { value: None }) => write!(f, "ret void"),
                    Terminator::Trap(_) => write!(f, "trap"),
                }
            }
        }

        Fmt {
            terminator: self,
            module,
        }
    }
}

macro_rules! define_terminator_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Terminator {
            fn from(inst: $typ) -> Self {
                Terminator::$variant(inst)
            }
        }
    };
}

define_terminator_from!(CBranch, CBranch);
define_terminator_from!(Jump, Jump);
define_terminator_from!(Ret, Ret);
define_terminator_from!(Trap, Trap);
