//! Error types for Trellis operations.
//!
//! Each failure class has its own enum so call sites can match on exactly
//! what they can get back:
//!
//! - [`StructuralError`]: a model mutation would break the cell tree or an
//!   edge's terminals. The mutation is not applied.
//! - [`IntegrityError`]: a snapshot cannot be imported. The current model is
//!   left untouched.
//! - [`ConnectionError`]: the validator refused a connection. This is a
//!   value, not a fault: [`ConnectionError::Silent`] means "do not connect,
//!   say nothing".
//!
//! [`TrellisError`] wraps all of them (plus registry, I/O and JSON errors)
//! for callers that just want one error type.

use std::io;

use thiserror::Error;

use trellis_core::{identifier::Id, routing::RegistryError};

/// A mutation that would violate the cell tree or terminal invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("unknown cell `{0}`")]
    UnknownCell(Id),

    #[error("unknown parent `{0}`")]
    UnknownParent(Id),

    #[error("a cell with id `{0}` already exists")]
    DuplicateId(Id),

    #[error("cell `{0}` cannot be its own parent")]
    SelfParent(Id),

    #[error("moving `{cell}` under `{parent}` would create a cycle")]
    Cycle { cell: Id, parent: Id },

    #[error("the root cell cannot be removed")]
    RemoveRoot,

    #[error("the root cell cannot be moved")]
    MoveRoot,

    #[error("cell `{0}` is not an edge")]
    NotAnEdge(Id),

    #[error("edge `{edge}` cannot be connected to itself or its descendant `{terminal}`")]
    TerminalIsEdge { edge: Id, terminal: Id },

    #[error("unknown terminal `{0}`")]
    UnknownTerminal(Id),
}

/// A snapshot that does not describe a well-formed model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("duplicate cell id `{0}`")]
    DuplicateId(Id),

    #[error("snapshot has no root cell")]
    MissingRoot,

    #[error("snapshot has more than one root: `{first}` and `{second}`")]
    MultipleRoots { first: Id, second: Id },

    #[error("root cell `{0}` must be a node")]
    EdgeRoot(Id),

    #[error("cell `{cell}` refers to unknown parent `{parent}`")]
    UnknownParent { cell: Id, parent: Id },

    #[error("cell `{0}` is part of a parent cycle")]
    Cycle(Id),

    #[error("edge `{edge}` refers to unknown terminal `{terminal}`")]
    UnknownTerminal { edge: Id, terminal: Id },

    #[error("edge `{edge}` is connected to itself or its descendant `{terminal}`")]
    InvalidTerminal { edge: Id, terminal: Id },

    #[error("edge `{0}` has no terminals")]
    MissingTerminals(Id),

    #[error("node `{0}` has terminals")]
    TerminalsOnNode(Id),

    #[error("record `{0}` is out of order: parents must precede their children, siblings in order")]
    OutOfOrder(Id),
}

/// A refused connection.
///
/// # Examples
///
/// ```
/// use trellis::ConnectionError;
///
/// assert_eq!(ConnectionError::new(""), ConnectionError::Silent);
/// assert_eq!(
///     ConnectionError::new("only one outgoing edge").message(),
///     Some("only one outgoing edge"),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Block the connection without reporting anything to the user.
    #[error("connection not allowed")]
    Silent,

    /// Block the connection and report the message.
    #[error("{0}")]
    Rejected(String),
}

impl ConnectionError {
    /// Builds an error from a message; an empty message means [`Self::Silent`].
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.is_empty() {
            Self::Silent
        } else {
            Self::Rejected(message)
        }
    }

    /// The message to report, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Silent => None,
            Self::Rejected(message) => Some(message),
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }
}

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Connection rejected: {0}")]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("operation not allowed while a transaction is open")]
    TransactionOpen,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
