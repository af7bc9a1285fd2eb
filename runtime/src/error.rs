use snare_core::{FlowError, SuspendError};
use thiserror::Error;

/// Failures of one driven exchange.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("transport failed for destination '{destination}': {source}")]
    Transport {
        destination: String,
        source: anyhow::Error,
    },
    #[error("suspension protocol violated by the driver: {0}")]
    Protocol(#[from] SuspendError),
}

impl EngineError {
    pub fn is_unhandled(&self) -> bool {
        matches!(self, EngineError::Flow(e) if e.is_unhandled())
    }
}
