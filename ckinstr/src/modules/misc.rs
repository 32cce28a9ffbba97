use crate::{
    modules::{
        instructions::{Instruction, InstructionFlags},
        operand::{Label, Name, Operand},
        symbol::FunctionPointer,
    },
    types::Typeref,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Function call instruction
///
/// Calls never unwind into the caller; a callee that cannot return normally
/// must trap or diverge instead.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Invoke {
    /// Callee, usually an `Operand::Func`. Any operand is accepted so that
    /// indirect calls through a register can be expressed.
    pub function: Operand,

    /// Arguments, in parameter order.
    pub args: Vec<Operand>,

    /// Destination of the returned value, `None` for `void` calls or when
    /// the result is discarded.
    pub dest: Option<Name>,

    /// Return type of the callee, `None` for `void`.
    pub ty: Option<Typeref>,
}

impl Invoke {
    /// Call `callee` for its side effects only.
    pub fn void_call(callee: FunctionPointer, args: Vec<Operand>) -> Self {
        Self {
            function: Operand::Func(callee),
            args,
            dest: None,
            ty: None,
        }
    }

    /// Direct callee, if any.
    pub fn callee(&self) -> Option<FunctionPointer> {
        match &self.function {
            Operand::Func(fptr) => Some(*fptr),
            _ => None,
        }
    }
}

impl Instruction for Invoke {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::MEMORY | InstructionFlags::CALL
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.function).chain(self.args.iter())
    }

    fn destination(&self) -> Option<Name> {
        self.dest
    }

    fn destination_type(&self) -> Option<Typeref> {
        self.dest.and(self.ty)
    }
}

/// Phi instruction
///
/// Selects a value depending on the predecessor block. Phi nodes sit at the
/// head of their block, before any other instruction.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phi {
    pub dest: Name,
    pub ty: Typeref,
    /// `(predecessor, value)` pairs.
    pub values: Vec<(Label, Operand)>,
}

impl Instruction for Phi {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::SIMPLE | InstructionFlags::PHI
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.values.iter().map(|(_, op)| op)
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Typeref> {
        Some(self.ty)
    }
}

/// Select instruction, `cond ? true_value : false_value`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Select {
    pub dest: Name,
    pub condition: Operand,
    pub true_value: Operand,
    pub false_value: Operand,
    pub ty: Typeref,
}

impl Instruction for Select {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::SIMPLE
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.condition, &self.true_value, &self.false_value].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn destination_type(&self) -> Option<Typeref> {
        Some(self.ty)
    }
}

/// Assertion meta-instruction
///
/// States that `condition` holds at this program point. Meta-instructions
/// never execute and are skipped when looking for a function's first real
/// instruction.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetaAssert {
    pub condition: Operand,
}

impl Instruction for MetaAssert {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::META | InstructionFlags::SIMPLE
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.condition)
    }
}

/// Assumption meta-instruction, the condition is taken for granted.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetaAssume {
    pub condition: Operand,
}

impl Instruction for MetaAssume {
    fn flags(&self) -> InstructionFlags {
        InstructionFlags::META | InstructionFlags::SIMPLE
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.condition)
    }
}
