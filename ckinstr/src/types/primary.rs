#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIs, EnumTryAs};

/// Represents an integer type with a specific bit width.
///
/// Signedness is not part of the type; instructions decide how to interpret
/// the bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(transparent)]
pub struct IType {
    num_bits: u32,
}

impl IType {
    pub const I1: Self = Self { num_bits: 1 };
    pub const I8: Self = Self { num_bits: 8 };
    pub const I16: Self = Self { num_bits: 16 };
    pub const I32: Self = Self { num_bits: 32 };
    pub const I64: Self = Self { num_bits: 64 };
    pub const I128: Self = Self { num_bits: 128 };
    pub const MIN_BITS: u32 = 1;
    pub const MAX_BITS: u32 = (1 << 23) - 1;

    /// Creates a new [`IType`] with the specified number of bits, or `None`
    /// if the width is outside `MIN_BITS..=MAX_BITS`.
    #[inline]
    pub const fn new(num_bits: u32) -> Option<Self> {
        if num_bits >= Self::MIN_BITS && num_bits <= Self::MAX_BITS {
            Some(Self { num_bits })
        } else {
            None
        }
    }

    /// Returns the number of bits of the integer type.
    #[inline]
    pub const fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Returns the largest unsigned value representable by this type.
    ///
    /// Values are limited to `u64`; wider integers return `None`.
    #[inline]
    pub const fn max_value(&self) -> Option<u64> {
        if self.num_bits > 64 {
            None
        } else if self.num_bits == 64 {
            Some(u64::MAX)
        } else {
            Some((1u64 << self.num_bits) - 1)
        }
    }
}

impl std::fmt::Display for IType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.num_bits)
    }
}

/// Floating-point formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FType {
    /// IEEE-754 binary16
    Fp16,
    /// 16-bit "brain" float, same exponent range as `Fp32`
    Bf16,
    /// IEEE-754 binary32
    Fp32,
    /// IEEE-754 binary64
    Fp64,
    /// IEEE-754 binary128
    Fp128,
    /// x87 80-bit extended precision
    X86Fp80,
    /// Pair of doubles (PowerPC)
    PPCFp128,
}

impl FType {
    /// Storage width in bits.
    pub const fn num_bits(&self) -> u32 {
        match self {
            FType::Fp16 | FType::Bf16 => 16,
            FType::Fp32 => 32,
            FType::Fp64 => 64,
            FType::X86Fp80 => 80,
            FType::Fp128 | FType::PPCFp128 => 128,
        }
    }
}

impl std::fmt::Display for FType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FType::Fp16 => "half",
            FType::Bf16 => "bfloat",
            FType::Fp32 => "float",
            FType::Fp64 => "double",
            FType::Fp128 => "fp128",
            FType::X86Fp80 => "x86_fp80",
            FType::PPCFp128 => "ppc_fp128",
        };
        write!(f, "{}", s)
    }
}

/// Opaque pointer type.
///
/// Pointers carry no pointee type; string constants are passed to the
/// profiling hooks as `ptr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PtrType;

impl std::fmt::Display for PtrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ptr")
    }
}

/// Non-composite types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimaryType {
    Int(IType),
    Fp(FType),
    Ptr(PtrType),
}

impl From<IType> for PrimaryType {
    fn from(value: IType) -> Self {
        PrimaryType::Int(value)
    }
}

impl From<FType> for PrimaryType {
    fn from(value: FType) -> Self {
        PrimaryType::Fp(value)
    }
}

impl From<PtrType> for PrimaryType {
    fn from(value: PtrType) -> Self {
        PrimaryType::Ptr(value)
    }
}

impl std::fmt::Display for PrimaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryType::Int(ty) => write!(f, "{}", ty),
            PrimaryType::Fp(ty) => write!(f, "{}", ty),
            PrimaryType::Ptr(ty) => write!(f, "{}", ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_limits() {
        assert_eq!(IType::I8.max_value(), Some(255));
        assert_eq!(IType::I64.max_value(), Some(u64::MAX));
        assert_eq!(IType::I128.max_value(), None);
        assert!(IType::new(0).is_none());
        assert_eq!(IType::new(17).map(|t| t.num_bits()), Some(17));
    }
}
