//! Types
//!
//! Canonical type representation for the IR. Types are deduplicated by a
//! [`TypeRegistry`] which hands out stable [`Typeref`] handles; instructions
//! and signatures only ever store handles.
//!
//! - Primary types: integers, floating-point formats and the opaque pointer
//!   (see `primary.rs`).
//! - Aggregate types: fixed-length arrays (see `aggregate.rs`).
use std::{
    collections::BTreeMap,
    hash::{DefaultHasher, Hash, Hasher},
};

use log::{debug, info};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use uuid::{Timestamp, Uuid};

use crate::types::{
    aggregate::ArrayType,
    primary::{IType, PrimaryType, PtrType},
};

pub mod aggregate;
pub mod primary;

/// A stable reference to a type stored inside a [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Typeref(pub(crate) Uuid);

impl Typeref {
    /// Underlying identifier of the type.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

/// Any type that can be stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnyType {
    /// Integers, floating-point values and pointers.
    Primary(PrimaryType),

    /// Fixed-length array, the element count is known at compile time.
    Array(ArrayType),
}

impl<S: Into<PrimaryType>> From<S> for AnyType {
    fn from(value: S) -> Self {
        AnyType::Primary(value.into())
    }
}

impl From<ArrayType> for AnyType {
    fn from(value: ArrayType) -> Self {
        AnyType::Array(value)
    }
}

impl AnyType {
    /// Returns the integer type if this is a scalar integer.
    pub fn as_int(&self) -> Option<IType> {
        match self {
            AnyType::Primary(PrimaryType::Int(ity)) => Some(*ity),
            _ => None,
        }
    }

    fn internal_fmt<'a>(
        &'a self,
        storage: &'a BTreeMap<Uuid, AnyType>,
    ) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            ty: &'a AnyType,
            storage: &'a BTreeMap<Uuid, AnyType>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.ty {
                    AnyType::Primary(primary) => write!(f, "{}", primary),
                    AnyType::Array(array) => write!(f, "{}", array.internal_fmt(self.storage)),
                }
            }
        }

        Fmt { ty: self, storage }
    }
}

/// Central store that deduplicates [`AnyType`] values.
///
/// Identical type descriptions always resolve to the same [`Typeref`].
///
/// ```rust
/// # use ckinstr::types::{TypeRegistry, primary::IType};
/// let reg = TypeRegistry::new([0u8; 6]);
/// let i8_ty = reg.search_or_insert(IType::I8.into());
/// assert_eq!(reg.search_or_insert(IType::I8.into()), i8_ty);
/// assert_eq!(reg.int_type(i8_ty), Some(IType::I8));
/// ```
pub struct TypeRegistry {
    array: RwLock<BTreeMap<Uuid, AnyType>>,
    inverse_lookup: RwLock<BTreeMap<u64, SmallVec<[Uuid; 1]>>>,
    context: uuid::timestamp::context::Context,
    node_id: [u8; 6],
}

impl TypeRegistry {
    fn hash_ty(ty: &AnyType) -> u64 {
        let mut hasher = DefaultHasher::new();
        ty.hash(&mut hasher);
        hasher.finish()
    }

    fn next_uuid(&self) -> Uuid {
        let ts = Timestamp::now(&self.context);
        Uuid::new_v6(ts, &self.node_id)
    }

    /// Create an empty registry. `node_id` seeds UUID allocation.
    pub fn new(node_id: [u8; 6]) -> Self {
        Self {
            array: Default::default(),
            // Lock order: always `array` before `inverse_lookup`.
            inverse_lookup: Default::default(),
            context: uuid::timestamp::context::Context::new(0),
            node_id,
        }
    }

    /// Number of distinct types stored.
    pub fn len(&self) -> usize {
        self.array.read().len()
    }

    /// Returns `true` if no type was registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the type behind `typeref`.
    ///
    /// The returned guard holds a read lock; drop it before calling
    /// [`Self::search_or_insert`].
    pub fn get(&self, typeref: Typeref) -> Option<MappedRwLockReadGuard<'_, AnyType>> {
        let guard = self.array.read_recursive();
        RwLockReadGuard::try_map(guard, |map| map.get(&typeref.0)).ok()
    }

    /// Return the [`Typeref`] of `ty`, registering it first if needed.
    ///
    /// Lookups go through a hash-keyed inverse index; colliding hashes keep
    /// a short list of candidates that are compared structurally.
    pub fn search_or_insert(&self, ty: AnyType) -> Typeref {
        let h = Self::hash_ty(&ty);

        let mut array_lock = self.array.upgradable_read();
        let mut inverse_lock = self.inverse_lookup.upgradable_read();

        if let Some(candidates) = inverse_lock.get(&h) {
            for uuid in candidates {
                if array_lock.get(uuid) == Some(&ty) {
                    return Typeref(*uuid);
                }
            }
        }

        // Upgrade in lock order.
        array_lock.with_upgraded(|array| {
            inverse_lock.with_upgraded(|inverse| {
                let uuid = self.next_uuid();

                if let Some(list) = inverse.get_mut(&h) {
                    info!(
                        "Type hash collision on 0x{:016x} while registering {} ({} existing candidates)",
                        h,
                        ty.internal_fmt(array),
                        list.len()
                    );
                    list.push(uuid);
                } else {
                    debug!(
                        "Registered new type {} with UUID {}",
                        ty.internal_fmt(array),
                        uuid
                    );
                    inverse.insert(h, smallvec![uuid]);
                }

                array.insert(uuid, ty);
                Typeref(uuid)
            })
        })
    }

    /// Shorthand for registering an integer type.
    pub fn int(&self, ty: IType) -> Typeref {
        self.search_or_insert(ty.into())
    }

    /// Shorthand for registering the opaque pointer type.
    pub fn ptr(&self) -> Typeref {
        self.search_or_insert(PtrType.into())
    }

    /// Shorthand for registering `[num_elements x elem]`.
    pub fn array(&self, elem: Typeref, num_elements: u64) -> Typeref {
        self.search_or_insert(
            ArrayType {
                ty: elem,
                num_elements,
            }
            .into(),
        )
    }

    /// Integer view of `typeref`, `None` for non-integer or unknown types.
    pub fn int_type(&self, typeref: Typeref) -> Option<IType> {
        self.get(typeref).and_then(|ty| ty.as_int())
    }

    /// Format a [`Typeref`] using this registry.
    pub fn fmt(&self, typeref: Typeref) -> impl std::fmt::Display + '_ {
        struct Fmt<'a> {
            registry: &'a TypeRegistry,
            typeref: Typeref,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let storage = self.registry.array.read_recursive();
                match storage.get(&self.typeref.0) {
                    Some(ty) => write!(f, "{}", ty.internal_fmt(&storage)),
                    None => write!(f, "<unknown type {}>", self.typeref.0),
                }
            }
        }

        Fmt {
            registry: self,
            typeref,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new([0; 6])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::primary::FType;

    #[test]
    fn test_deduplicates_identical_types() {
        let reg = TypeRegistry::default();
        let a = reg.int(IType::I32);
        let b = reg.int(IType::I32);
        let c = reg.int(IType::I64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_formats_nested_arrays() {
        let reg = TypeRegistry::default();
        let i8_ty = reg.int(IType::I8);
        let arr = reg.array(i8_ty, 9);
        assert_eq!(format!("{}", reg.fmt(arr)), "[9 x i8]");
        assert_eq!(reg.int_type(arr), None);
        let f = reg.search_or_insert(FType::Fp64.into());
        assert_eq!(format!("{}", reg.fmt(f)), "double");
    }
}
