//! Per-module constant pool.
//!
//! The pool owns the immutable byte strings referenced by `Operand::Str` and
//! the external function declarations referenced by
//! `FunctionPointer::External`. Both are content-addressed: interning the same
//! bytes twice, or declaring the same name with the same signature twice,
//! yields the handle created the first time. Entries are never evicted.
use std::collections::BTreeMap;

use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    modules::symbol::{ExternalFunction, FunctionPointer, Signature},
    types::{TypeRegistry, Typeref, primary::IType},
    utils::Error,
};

/// Stable handle to a pooled string constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrRef(pub(crate) u32);

impl StrRef {
    /// Position of the constant in pool order.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for StrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@str.{}", self.0)
    }
}

/// Immutable, NUL-terminated byte string stored in the pool.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StringConstant {
    /// Content without the trailing NUL.
    pub bytes: Box<[u8]>,
    /// Storage type, `[len + 1 x i8]`.
    pub ty: Typeref,
}

impl StringConstant {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content as text, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Escaped C-string literal including the terminator, e.g. `c"main\00"`.
    pub fn escaped(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() + 6);
        out.push_str("c\"");
        for &b in self.bytes.iter() {
            if (b.is_ascii_graphic() && b != b'"' && b != b'\\') || b == b' ' {
                out.push(b as char);
            } else {
                out.push_str(&format!("\\{:02X}", b));
            }
        }
        out.push_str("\\00\"");
        out
    }
}

/// String constants and external declarations of a module.
///
/// Only the entries are serialized; the lookup indexes are rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(from = "PoolEntries", into = "PoolEntries")
)]
pub struct ConstantPool {
    strings: Vec<StringConstant>,
    string_index: BTreeMap<Box<[u8]>, StrRef>,
    declarations: BTreeMap<Uuid, ExternalFunction>,
    declaration_index: BTreeMap<String, Uuid>,
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct PoolEntries {
    strings: Vec<StringConstant>,
    declarations: Vec<ExternalFunction>,
}

#[cfg(feature = "serde")]
impl From<PoolEntries> for ConstantPool {
    fn from(entries: PoolEntries) -> Self {
        let string_index = entries
            .strings
            .iter()
            .enumerate()
            .map(|(i, constant)| (constant.bytes.clone(), StrRef(i as u32)))
            .collect();
        let declaration_index = entries
            .declarations
            .iter()
            .map(|decl| (decl.name.clone(), decl.uuid))
            .collect();
        let declarations = entries
            .declarations
            .into_iter()
            .map(|decl| (decl.uuid, decl))
            .collect();
        Self {
            strings: entries.strings,
            string_index,
            declarations,
            declaration_index,
        }
    }
}

#[cfg(feature = "serde")]
impl From<ConstantPool> for PoolEntries {
    fn from(pool: ConstantPool) -> Self {
        Self {
            strings: pool.strings,
            declarations: pool.declarations.into_values().collect(),
        }
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the constant holding `bytes`, allocating it on first request.
    pub fn intern(&mut self, registry: &TypeRegistry, bytes: impl AsRef<[u8]>) -> StrRef {
        let bytes = bytes.as_ref();
        if let Some(existing) = self.string_index.get(bytes) {
            return *existing;
        }

        let str_ref = StrRef(self.strings.len() as u32);
        let elem = registry.int(IType::I8);
        let ty = registry.array(elem, bytes.len() as u64 + 1);
        let constant = StringConstant {
            bytes: bytes.into(),
            ty,
        };

        debug!("Pooled string constant {} = {}", str_ref, constant.escaped());
        self.string_index.insert(bytes.into(), str_ref);
        self.strings.push(constant);
        str_ref
    }

    /// Look up a pooled string.
    pub fn string(&self, str_ref: StrRef) -> Option<&StringConstant> {
        self.strings.get(str_ref.index())
    }

    /// Handle of `bytes` if it was already interned.
    pub fn find_string(&self, bytes: impl AsRef<[u8]>) -> Option<StrRef> {
        self.string_index.get(bytes.as_ref()).copied()
    }

    /// All pooled strings, in allocation order.
    pub fn strings(&self) -> impl Iterator<Item = (StrRef, &StringConstant)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, constant)| (StrRef(i as u32), constant))
    }

    pub fn num_strings(&self) -> usize {
        self.strings.len()
    }

    /// Declare the external function `name` with `signature`.
    ///
    /// Re-declaring an existing name with an identical signature returns the
    /// existing declaration. A different signature is an
    /// [`Error::InconsistentDeclaration`].
    pub fn declare(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<FunctionPointer, Error> {
        if let Some(uuid) = self.declaration_index.get(name) {
            let existing = &self.declarations[uuid];
            if existing.signature != signature {
                return Err(Error::InconsistentDeclaration {
                    name: name.to_string(),
                    existing: Box::new(existing.signature.clone()),
                    requested: Box::new(signature),
                });
            }
            return Ok(FunctionPointer::External(*uuid));
        }

        let uuid = Uuid::new_v4();
        debug!("Declared external function `{}` ({})", name, uuid);
        self.declaration_index.insert(name.to_string(), uuid);
        self.declarations.insert(
            uuid,
            ExternalFunction {
                uuid,
                name: name.to_string(),
                signature,
            },
        );
        Ok(FunctionPointer::External(uuid))
    }

    pub fn declaration(&self, uuid: Uuid) -> Option<&ExternalFunction> {
        self.declarations.get(&uuid)
    }

    pub fn declaration_by_name(&self, name: &str) -> Option<&ExternalFunction> {
        self.declaration_index
            .get(name)
            .and_then(|uuid| self.declarations.get(uuid))
    }

    /// All declarations, ordered by UUID.
    pub fn declarations(&self) -> impl Iterator<Item = &ExternalFunction> {
        self.declarations.values()
    }

    pub fn num_declarations(&self) -> usize {
        self.declarations.len()
    }

    /// Total number of pooled entries (strings and declarations).
    pub fn len(&self) -> usize {
        self.num_strings() + self.num_declarations()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
