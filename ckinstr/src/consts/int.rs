#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::primary::IType;

/// Integer constant of a given width.
///
/// Payloads are limited to 64 bits; wider integer types can be named but
/// only constants that fit in a `u64` can be materialized.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IConst {
    pub ty: IType,
    pub value: u64,
}

impl IConst {
    /// Returns `true` if `value` fits in `ty`.
    #[inline]
    pub const fn verify(&self) -> bool {
        match self.ty.max_value() {
            Some(max) => self.value <= max,
            None => true,
        }
    }

    /// Build a constant, `None` if `value` does not fit in `ty`.
    #[inline]
    pub const fn new(ty: IType, value: u64) -> Option<Self> {
        let constant = Self { ty, value };
        if constant.verify() {
            Some(constant)
        } else {
            None
        }
    }
}

impl std::fmt::Display for IConst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.value)
    }
}
