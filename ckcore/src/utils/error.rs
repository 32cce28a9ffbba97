use std::path::PathBuf;

use strum::{EnumDiscriminants, EnumIs};
use thiserror::Error;

/// Internal-consistency violations. They cannot happen on well-formed IR
/// and abort the current module run.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum StructuralFault {
    #[error("Function `{function}` is malformed: {reason}")]
    MalformedFunction { function: String, reason: String },

    #[error(
        "Function `{function}` is absent from the name index. Only functions with a body are indexed when the module is initialized."
    )]
    UnknownFunction { function: String },
}

/// Violations of the call-site synthesizer input contract. The module is
/// left untouched when one of these is reported.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum PreconditionFault {
    #[error("The target module must contain exactly one function, found {count}.")]
    MultipleFunctions { count: usize },

    #[error(
        "Function `{function}` may unwind into its caller. Only `nounwind` functions can be driven by synthesized call sites."
    )]
    MayUnwind { function: String },

    #[error("Function `{function}` must take exactly one parameter, found {count}.")]
    WrongArity { function: String, count: usize },

    #[error("The parameter of function `{function}` has type `{ty}`, expected a fixed-width integer.")]
    NonIntegerParameter { function: String, ty: String },

    #[error(
        "The parameter of function `{function}` is {bits} bits wide. Sampling supports integers of at most 64 bits."
    )]
    WidthOverflow { function: String, bits: u32 },

    #[error(
        "Cannot synthesize the driver `{name}`: a function with this name already exists in the module."
    )]
    DriverNameTaken { name: String },
}

#[derive(Debug, Error, EnumIs, EnumDiscriminants)]
#[strum_discriminants(name(FaultKind), derive(Hash))]
pub enum CkError {
    #[error("Invariant violated: {0}")]
    Structural(#[from] StructuralFault),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionFault),

    /// An external symbol clashes with an incompatible existing one.
    #[error("Declaration conflict: {0}")]
    Declaration(ckinstr::utils::Error),

    #[error("IR error: {0}")]
    Ir(ckinstr::utils::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: PathBuf,
    },

    #[error("Failed to serialize configuration to '{file}': {source}")]
    ConfigSerialize {
        source: toml::ser::Error,
        file: PathBuf,
    },

    #[error("Invalid configuration value for `{key}`: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("No pass named '{0}' is registered")]
    UnknownPass(String),
}

impl From<ckinstr::utils::Error> for CkError {
    fn from(value: ckinstr::utils::Error) -> Self {
        if value.is_inconsistent_declaration() {
            CkError::Declaration(value)
        } else {
            CkError::Ir(value)
        }
    }
}

impl CkError {
    /// Only precondition faults leave the module in its original state and
    /// may be handled by the caller.
    pub fn is_recoverable(&self) -> bool {
        self.is_precondition()
    }

    pub fn fault_kind(&self) -> FaultKind {
        self.into()
    }
}

pub type CkResult<T> = Result<T, CkError>;

#[cfg(test)]
mod tests {
    use ckinstr::{modules::symbol::Signature, utils::Error};

    use super::*;

    #[test]
    fn test_ir_errors_are_classified() {
        let err: CkError = Error::InconsistentDeclaration {
            name: "checkpoint".to_string(),
            existing: Box::new(Signature::void(vec![])),
            requested: Box::new(Signature::void(vec![])),
        }
        .into();
        assert_eq!(err.fault_kind(), FaultKind::Declaration);
        assert!(!err.is_recoverable());

        let err: CkError = Error::DuplicateFunctionName {
            name: "main".to_string(),
        }
        .into();
        assert_eq!(err.fault_kind(), FaultKind::Ir);
    }

    #[test]
    fn test_only_preconditions_are_recoverable() {
        let err: CkError = PreconditionFault::WrongArity {
            function: "f".to_string(),
            count: 2,
        }
        .into();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("exactly one parameter"));

        let err: CkError = StructuralFault::UnknownFunction {
            function: "f".to_string(),
        }
        .into();
        assert!(!err.is_recoverable());
        assert_eq!(err.fault_kind(), FaultKind::Structural);
    }
}
