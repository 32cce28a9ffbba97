//! Shared operand types for instructions.
//!
//! An operand is either another SSA value (`Reg`), an integer literal
//! (`Imm`), a pointer to a pooled string constant (`Str`) or a function
//! symbol (`Func`).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

use crate::{
    consts::IConst,
    modules::{Module, pool::StrRef, symbol::FunctionPointer},
};

/// SSA value identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Name(pub u32);

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Basic block label, only meaningful inside the function that defines it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label(pub u32);

impl Label {
    /// Label conventionally given to the entry block.
    pub const NIL: Label = Label(0);
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "label %block_{}", self.0)
        } else {
            write!(f, "block_{}", self.0)
        }
    }
}

/// Instruction operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Reference to a previously defined SSA value.
    Reg(Name),
    /// Integer literal.
    Imm(IConst),
    /// Pointer to the first byte of a pooled string constant.
    Str(StrRef),
    /// Function symbol, internal or external.
    Func(FunctionPointer),
}

impl From<Name> for Operand {
    fn from(value: Name) -> Self {
        Operand::Reg(value)
    }
}

impl From<IConst> for Operand {
    fn from(value: IConst) -> Self {
        Operand::Imm(value)
    }
}

impl From<StrRef> for Operand {
    fn from(value: StrRef) -> Self {
        Operand::Str(value)
    }
}

impl From<FunctionPointer> for Operand {
    fn from(value: FunctionPointer) -> Self {
        Operand::Func(value)
    }
}

impl Operand {
    /// Render the operand, resolving symbols through `module` when given.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            operand: &'a Operand,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.operand {
                    Operand::Reg(name) => write!(f, "{}", name),
                    Operand::Imm(constant) => write!(f, "{}", constant),
                    Operand::Str(str_ref) => write!(f, "ptr {}", str_ref),
                    Operand::Func(fptr) => {
                        match self.module.and_then(|module| module.symbol_name(fptr)) {
                            Some(name) => write!(f, "@{}", name),
                            None => write!(f, "@{}", fptr),
                        }
                    }
                }
            }
        }

        Fmt {
            operand: self,
            module,
        }
    }
}
