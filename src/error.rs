use thiserror::Error;

use crate::config::ConfigError;
use crate::construct::{ConstructKind, Phase};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The producer handed over a phase that is neither open nor close.
    /// The event source is corrupted and processing must stop.
    #[error("Invalid phase: {raw}")]
    InvalidPhase { raw: String },

    #[error("Unknown construct kind: {raw}")]
    UnknownConstruct { raw: String },

    #[error("Malformed event: {raw}")]
    MalformedEvent { raw: String },

    #[error("Listener is not registered")]
    ListenerNotRegistered,

    #[error("Dispatch of {phase} {kind} while another event is in flight")]
    NestedDispatch { kind: ConstructKind, phase: Phase },

    #[error("Handler failed on {phase} {kind}: {message}")]
    Handler {
        kind: ConstructKind,
        phase: Phase,
        message: String,
    },

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
}

impl DispatchError {
    /// Fatal errors signal a broken producer, everything else is a
    /// programmer error on the client side.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::InvalidPhase { .. })
    }

    pub fn handler<S: Into<String>>(kind: ConstructKind, phase: Phase, message: S) -> Self {
        DispatchError::Handler {
            kind,
            phase,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Observer is not registered")]
    ObserverNotRegistered,

    /// The observer is already inside one of its own callbacks.
    #[error("Observer is busy and cannot be notified re-entrantly")]
    ObserverBusy,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<PolicyError> for Error {
    fn from(err: PolicyError) -> Self {
        Error::Dispatch(DispatchError::Policy(err))
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
pub type InternalResult<T> = Result<T, Error>;
