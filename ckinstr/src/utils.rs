use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::modules::{InsertPoint, operand::Label, symbol::Signature};

#[derive(Debug, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// Two functions of the same module share a name.
    #[error(
        "A function named `{name}` is already defined within the module. Function names must be unique within a module."
    )]
    DuplicateFunctionName { name: String },

    /// A symbol is requested with a signature different from the existing one.
    #[error(
        "The symbol `{name}` is already declared with signature `{existing:?}`, which conflicts with the requested signature `{requested:?}`."
    )]
    InconsistentDeclaration {
        name: String,
        existing: Box<Signature>,
        requested: Box<Signature>,
    },

    /// The insertion point does not reference an existing instruction.
    #[error(
        "The insertion point `{point:?}` does not reference an instruction or terminator of function `{function}`."
    )]
    InvalidInsertPoint {
        function: String,
        point: InsertPoint,
    },

    /// A block label is used twice within the same function.
    #[error(
        "The basic block label `{label}` is already used in function `{function}`. Labels must be unique within a function."
    )]
    BlockLabelAlreadyExists { function: String, label: Label },
}
