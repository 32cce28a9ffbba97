//! External symbols and function signatures.
//!
//! Functions defined outside the module (the profiling runtime hooks for
//! instance) are represented by [`ExternalFunction`]; call sites refer to
//! any callee through a [`FunctionPointer`].
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumDiscriminants;
use uuid::Uuid;

use crate::{
    modules::CallingConvention,
    types::{TypeRegistry, Typeref},
};

/// Prototype of a callable symbol.
///
/// Two declarations are compatible if and only if their signatures are equal.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Signature {
    pub param_types: Vec<Typeref>,
    /// `None` stands for `void`.
    pub return_type: Option<Typeref>,
    pub cconv: CallingConvention,
}

impl Signature {
    /// `void (params...)` with the default calling convention.
    pub fn void(param_types: Vec<Typeref>) -> Self {
        Self {
            param_types,
            return_type: None,
            cconv: CallingConvention::default(),
        }
    }

    /// Render as `ret (p0, p1, ...)`.
    pub fn fmt<'a>(&'a self, registry: &'a TypeRegistry) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            signature: &'a Signature,
            registry: &'a TypeRegistry,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.signature.return_type {
                    Some(ty) => write!(f, "{} (", self.registry.fmt(ty))?,
                    None => write!(f, "void (")?,
                }
                for (i, ty) in self.signature.param_types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.registry.fmt(*ty))?;
                }
                write!(f, ")")
            }
        }

        Fmt {
            signature: self,
            registry,
        }
    }
}

/// A function declared in this module but defined elsewhere.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExternalFunction {
    /// Identifier used by [`FunctionPointer::External`].
    pub uuid: Uuid,

    /// Link-time symbol name.
    pub name: String,

    pub signature: Signature,
}

/// A reference to a function symbol, internal or external.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, EnumDiscriminants)]
#[strum_discriminants(name(FunctionPointerType))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FunctionPointer {
    /// Function defined in the current module.
    Internal(Uuid),

    /// Declaration held by the module's constant pool.
    External(Uuid),
}

impl FunctionPointer {
    pub fn uuid(&self) -> Uuid {
        match self {
            FunctionPointer::Internal(uuid) | FunctionPointer::External(uuid) => *uuid,
        }
    }
}

impl std::fmt::Display for FunctionPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", FunctionPointerType::from(self), self.uuid())
    }
}

impl std::fmt::Display for FunctionPointerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionPointerType::Internal => write!(f, "internal"),
            FunctionPointerType::External => write!(f, "external"),
        }
    }
}
