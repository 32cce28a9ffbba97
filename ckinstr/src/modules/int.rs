//! Integer instructions
//!
//! Wrapping arithmetic and comparisons over integer values. The transforms
//! never look inside these; they exist so test and host functions have
//! realistic bodies.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        instructions::{Instruction, InstructionFlags},
        operand::{Name, Operand},
    },
    types::Typeref,
};

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ICmpVariant {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl ICmpVariant {
    pub fn to_str(&self) -> &'static str {
        match self {
            ICmpVariant::Eq => "eq",
            ICmpVariant::Ne => "ne",
            ICmpVariant::Ugt => "ugt",
            ICmpVariant::Uge => "uge",
            ICmpVariant::Ult => "ult",
            ICmpVariant::Ule => "ule",
            ICmpVariant::Sgt => "sgt",
            ICmpVariant::Sge => "sge",
            ICmpVariant::Slt => "slt",
            ICmpVariant::Sle => "sle",
        }
    }
}

macro_rules! define_binary_int_instr {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name {
            pub dest: Name,
            pub ty: Typeref,
            pub lhs: Operand,
            pub rhs: Operand,
        }

        impl Instruction for $name {
            fn flags(&self) -> InstructionFlags {
                InstructionFlags::SIMPLE | InstructionFlags::ARITHMETIC
            }

            fn operands(&self) -> impl Iterator<Item = &Operand> {
                [&self.lhs, &self.rhs].into_iter()
            }

            fn destination(&self) -> Option<Name> {
                Some(self.dest)
            }

            fn destination_type(&self) -> Option<Typeref> {
                Some(self.ty)
            }
        }
    };
}

define_binary_int_instr!(
    /// Wrapping integer addition
    IAdd
);
define_binary_int_instr!(
    /// Wrapping integer subtraction
    ISub
);
define_binary_int_instr!(
    /// Wrapping integer multiplication
    IMul
);

/// Integer comparison, produces an `i1`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ICmp {
    pub dest: Name,
    /// Result type, always `i1`.
    pub ty: Typeref,
    pub lhs: Operand,
    pub rhs: Operand,
    pub variant: ICmpVariant,
}

impl Instruction for ICmp {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::SIMPLE | InstructionFlags::ARITHMETIC
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.lhs, &self.rhs].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Typeref> {
        Some(self.ty)
    }
}
