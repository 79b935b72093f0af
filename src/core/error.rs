use std::fmt;
use thiserror::Error;

use crate::protocol::{CommandKind, NotificationKind};
use crate::transport::TransportError;

/// Why a peripheral could not be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralFault {
    /// No peripheral with the requested identifier is known to the transport
    NotFound,
    /// The connection attempt failed
    ConnectFailed,
    /// Connected, but services or characteristics are not ready
    NotReady,
    /// The link dropped or the notification stream ended mid-exchange
    Disconnected,
}

impl fmt::Display for PeripheralFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeripheralFault::NotFound => write!(f, "not found"),
            PeripheralFault::ConnectFailed => write!(f, "connect failed"),
            PeripheralFault::NotReady => write!(f, "not ready"),
            PeripheralFault::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// The step of an exchange that ran out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    /// Writing the command chunks
    Write,
    /// Waiting for a decodable notification
    Notification,
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeStage::Write => write!(f, "write"),
            ExchangeStage::Notification => write!(f, "notification"),
        }
    }
}

/// Errors surfaced by the protocol engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Transport unavailable")]
    TransportUnavailable,

    #[error("Peripheral unreachable: {0}")]
    PeripheralUnreachable(PeripheralFault),

    #[error("No notification received for {command:?} during {stage} stage")]
    NotificationNotReceived {
        /// Command that was waiting
        command: CommandKind,
        /// Step that timed out
        stage: ExchangeStage,
    },

    #[error("Operation cancelled")]
    OperationCancelled,

    #[error("Operation already in progress")]
    AlreadyInProgress,

    #[error("Protocol decode error: {command:?} cannot produce {received:?}")]
    ProtocolDecode {
        /// Command that was waiting
        command: CommandKind,
        /// Shape that arrived instead
        received: NotificationKind,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Creates a new invalid command error
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Error::InvalidCommand(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the error is a cancellation outcome rather than a fault
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::OperationCancelled)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable => Error::TransportUnavailable,
            TransportError::NotFound => Error::PeripheralUnreachable(PeripheralFault::NotFound),
            TransportError::ConnectFailed(_) => {
                Error::PeripheralUnreachable(PeripheralFault::ConnectFailed)
            }
            TransportError::NotReady => Error::PeripheralUnreachable(PeripheralFault::NotReady),
            TransportError::Disconnected => {
                Error::PeripheralUnreachable(PeripheralFault::Disconnected)
            }
            TransportError::AlreadyInProgress => Error::AlreadyInProgress,
            TransportError::Cancelled => Error::OperationCancelled,
            TransportError::Other(msg) => Error::Internal(msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
