use auto_enums::auto_enum;
use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::{
    modules::{
        int, misc,
        operand::{Name, Operand},
    },
    types::Typeref,
};

bitflags! {
    /// Classification bits shared by every instruction kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InstructionFlags: u32 {
        /// Meta-instruction (assertions, assumptions). Never executed.
        const META = 1 << 0;

        /// No side effect besides a possible trap; may be duplicated freely.
        const SIMPLE = 1 << 1;

        /// Integer arithmetic or comparison.
        const ARITHMETIC = 1 << 2;

        /// Phi node, must lead its basic block.
        const PHI = 1 << 3;

        /// May read or write memory.
        const MEMORY = 1 << 4;

        /// Transfers control to another function and back.
        const CALL = 1 << 5;
    }
}

/// Common interface implemented by every instruction node.
pub trait Instruction {
    fn flags(&self) -> InstructionFlags;

    /// Phi nodes and meta-instructions. Insertion points placed at the
    /// "start" of a block go after these.
    #[inline]
    fn is_metadata(&self) -> bool {
        self.flags()
            .intersects(InstructionFlags::META | InstructionFlags::PHI)
    }

    /// Iterate over all input operands.
    fn operands(&self) -> impl Iterator<Item = &Operand>;

    /// Destination SSA name, if the instruction produces a value.
    fn destination(&self) -> Option<Name> {
        None
    }

    /// Type of the produced value, if any.
    fn destination_type(&self) -> Option<Typeref> {
        None
    }
}

/// Closed set of instruction kinds.
///
/// The transforms only ever build `Invoke` instructions and skip over
/// metadata; everything else is carried through untouched.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(CkInstrOp))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CkInstr {
    IAdd(int::IAdd),
    ISub(int::ISub),
    IMul(int::IMul),
    ICmp(int::ICmp),

    Invoke(misc::Invoke),
    Phi(misc::Phi),
    Select(misc::Select),

    MetaAssert(misc::MetaAssert),
    MetaAssume(misc::MetaAssume),
}

impl CkInstrOp {
    /// Mnemonic used by the printer.
    pub fn opname(&self) -> &'static str {
        match self {
            CkInstrOp::IAdd => "iadd",
            CkInstrOp::ISub => "isub",
            CkInstrOp::IMul => "imul",
            CkInstrOp::ICmp => "icmp",
            CkInstrOp::Invoke => "invoke",
            CkInstrOp::Phi => "phi",
            CkInstrOp::Select => "select",
            CkInstrOp::MetaAssert => "!assert",
            CkInstrOp::MetaAssume => "!assume",
        }
    }
}

impl CkInstr {
    pub fn op(&self) -> CkInstrOp {
        self.into()
    }
}

macro_rules! define_instr_any_instr {
    (
        $($variant:ident),* $(,)?
    ) => {
        impl Instruction for CkInstr {
            fn flags(&self) -> InstructionFlags {
                match self {
                    $(
                        CkInstr::$variant(instr) => instr.flags(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands(&self) -> impl Iterator<Item = &Operand> {
                match self {
                    $(
                        CkInstr::$variant(instr) => instr.operands(),
                    )*
                }
            }

            fn destination(&self) -> Option<Name> {
                match self {
                    $(
                        CkInstr::$variant(instr) => instr.destination(),
                    )*
                }
            }

            fn destination_type(&self) -> Option<Typeref> {
                match self {
                    $(
                        CkInstr::$variant(instr) => instr.destination_type(),
                    )*
                }
            }
        }

        $(
            impl From<$variant> for CkInstr {
                fn from(instr: $variant) -> Self {
                    CkInstr::$variant(instr)
                }
            }
        )*
    };
}

use int::{IAdd, ICmp, IMul, ISub};
use misc::{Invoke, MetaAssert, MetaAssume, Phi, Select};

define_instr_any_instr!(
    IAdd, ISub, IMul, ICmp, Invoke, Phi, Select, MetaAssert, MetaAssume,
);
