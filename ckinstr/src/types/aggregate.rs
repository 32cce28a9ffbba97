use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AnyType, Typeref};

/// Fixed-length array of a single element type.
///
/// Pooled string constants are stored as `[N x i8]`, `N` counting the
/// trailing NUL byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayType {
    pub ty: Typeref,
    pub num_elements: u64,
}

impl ArrayType {
    pub(super) fn internal_fmt<'a>(
        &'a self,
        storage: &'a BTreeMap<Uuid, AnyType>,
    ) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            array: &'a ArrayType,
            storage: &'a BTreeMap<Uuid, AnyType>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "[{} x ", self.array.num_elements)?;
                match self.storage.get(&self.array.ty.0) {
                    Some(elem) => write!(f, "{}", elem.internal_fmt(self.storage))?,
                    None => write!(f, "<unknown type {}>", self.array.ty.0)?,
                }
                write!(f, "]")
            }
        }

        Fmt {
            array: self,
            storage,
        }
    }
}
