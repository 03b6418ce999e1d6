//! Errors generated by the grammar transformation pipeline.
use crate::{GPosIdx, Id, WithPos};
use itertools::Itertools;

/// Convenience wrapper to represent success or meaningful compiler error.
pub type PackratResult<T> = std::result::Result<T, Error>;

/// Errors generated by the grammar pipeline
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    pos: GPosIdx,
}

/// A collection of errors reported by a single pass.
pub struct MultiError {
    errors: Vec<Error>,
}

impl From<Vec<Error>> for MultiError {
    fn from(errors: Vec<Error>) -> Self {
        MultiError { errors }
    }
}

impl From<Error> for MultiError {
    fn from(err: Error) -> Self {
        MultiError { errors: vec![err] }
    }
}

impl MultiError {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }
}

impl std::fmt::Debug for MultiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.errors.iter().map(|e| format!("{e:?}")).join("\n"))
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pos.format(self.kind.to_string()))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error {
    pub fn with_pos<T: WithPos>(mut self, pos: &T) -> Self {
        self.pos = pos.copy_span();
        self
    }

    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            pos: GPosIdx::UNKNOWN,
        }
    }

    /// The grammar violates a structural requirement of the IR, such as a
    /// binding without a value.
    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::MalformedStructure(msg.to_string()))
    }

    /// An assumption a pass makes about its input does not hold.
    pub fn pass_assumption<S: ToString, M: ToString>(pass: S, msg: M) -> Self {
        Self::new(ErrorKind::PassAssumption(pass.to_string(), msg.to_string()))
    }

    /// A nonterminal or module that cannot be resolved.
    pub fn undefined<S: ToString>(name: Id, typ: S) -> Self {
        Self::new(ErrorKind::Undefined(name, typ.to_string()))
    }

    /// A nonterminal that resolves to more than one production.
    pub fn ambiguous<S: ToString>(name: Id, candidates: S) -> Self {
        Self::new(ErrorKind::Ambiguous(name, candidates.to_string()))
    }

    /// A violated internal contract.
    pub fn contract<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Contract(msg.to_string()))
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidFile(msg.to_string()))
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::WriteError(msg.to_string()))
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Misc(msg.to_string()))
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn location(&self) -> GPosIdx {
        self.pos
    }
}

/// Standard error type for the pipeline.
#[derive(Clone, thiserror::Error)]
enum ErrorKind {
    /// The grammar structure is malformed.
    #[error("Malformed grammar: {0}")]
    MalformedStructure(String),

    /// The input to a pass violates its assumptions.
    #[error("Pass `{0}` assumption violated: {1}")]
    PassAssumption(String, String),

    /// The name has not been bound.
    #[error("Undefined {1}: {0}")]
    Undefined(Id, String),

    /// The name resolves to more than one definition.
    #[error("Ambiguous nonterminal `{0}`, candidates: {1}")]
    Ambiguous(Id, String),

    /// An internal invariant was broken.
    #[error("Contract violated: {0}")]
    Contract(String),

    /// The input file is invalid (does not exist, cannot be parsed, ...)
    #[error("{0}")]
    InvalidFile(String),

    /// Failed to write the output
    #[error("{0}")]
    WriteError(String),

    /// A miscellaneous error. Should be replaced with a more precise error.
    #[error("{0}")]
    Misc(String),
}

impl std::fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

// Conversions from other error types to our error type so that
// we can use `?` in all the places.
impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::invalid_file(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::invalid_file(format!("Malformed grammar AST: {e}"))
    }
}
