use crate::outcome::Outcome;
use thiserror::Error;

pub type FlowResult<T> = Result<Outcome<T>, FlowError>;

/// Hard failures of a single request's evaluation.
///
/// Rejection is not an error and never shows up here, except at the root where
/// exhausting every branch becomes [`FlowError::Unhandled`].
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("no branch of the flow accepted the request")]
    Unhandled,
    #[error("branch {branch} of flow '{node}' rejected after issuing a suspension")]
    RejectedAfterSuspend { node: String, branch: usize },
    #[error(transparent)]
    Suspend(#[from] SuspendError),
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl FlowError {
    pub fn fault(
        message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    ) -> Self {
        FlowError::Fault(anyhow::Error::msg(message))
    }

    pub fn is_unhandled(&self) -> bool {
        matches!(self, FlowError::Unhandled)
    }
}

/// Violations of the suspend/resume contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuspendError {
    #[error("computation is not suspended")]
    NotSuspended,
    #[error("resume token {got} does not match outstanding suspension {expected}")]
    StaleToken { expected: u64, got: u64 },
    #[error("a suspension is already outstanding for this request")]
    AlreadyOutstanding,
    #[error("suspension {0} must be resumed before the computation can continue")]
    AwaitingResume(u64),
    #[error("computation has already finished")]
    Finished,
    #[error("suspension payload is not a {expected}")]
    PayloadType { expected: &'static str },
}

/// Errors raised while loading [`Parameters`](crate::params::Parameters).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
