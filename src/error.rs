use crate::id::SpvId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The translator's error taxonomy (spec.md §6, §7).
///
/// Every per-opcode translator returns `Ok` or one of these variants; the
/// dispatch loop (`Translator::translate`) short-circuits on the first one
/// it sees. None of these originate from a panic — only input-module
/// conditions raise them.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ErrorKind {
    #[error("extension '{0}' is not supported by this device")]
    UnsupportedExtension(String),
    #[error("capability {0:?} is not supported by this device")]
    UnsupportedCapability(spirv::Capability),
    #[error("addressing model {0:?} is not supported by this device")]
    UnsupportedAddressingModel(spirv::AddressingModel),
    #[error("extended instruction set '{0}' is not supported")]
    UnsupportedExtInstSet(String),
    #[error("opcode {0:?} is recognized but not supported by this translator")]
    UnsupportedOpcode(spirv::Op),
    #[error("execution mode {0:?} is not supported")]
    UnsupportedExecutionMode(spirv::ExecutionMode),
    #[error("invalid function parameter attribute on {0:?}: {1}")]
    InvalidFunctionParameterAttribute(SpvId, &'static str),
    #[error("invalid storage class {0:?} for {1}")]
    InvalidStorageClass(spirv::StorageClass, &'static str),
    #[error("forward reference to {0:?} was never resolved")]
    ForwardReferenceUnresolved(SpvId),
    #[error("malformed instruction {op:?}: {reason}")]
    MalformedInstruction {
        op: spirv::Op,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}
