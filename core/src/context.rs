use crate::error::FlowError;
use crate::params::Parameters;
use crate::suspend::Suspender;
use std::sync::Arc;

/// What a branch or transform sees of the flow it runs in.
///
/// Carries the parameters of the node being evaluated and the suspension handle
/// of the request being evaluated. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct FlowContext {
    suspender: Suspender,
    parameters: Option<Arc<Parameters>>,
}

impl FlowContext {
    pub fn new(suspender: Suspender) -> Self {
        Self {
            suspender,
            parameters: None,
        }
    }

    /// Same request, parameters of another node.
    pub fn with_parameters(&self, parameters: Option<Arc<Parameters>>) -> Self {
        Self {
            suspender: self.suspender.clone(),
            parameters,
        }
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_deref()
    }

    pub fn suspender(&self) -> &Suspender {
        &self.suspender
    }

    /// Suspends the evaluation, handing `request` to the driver under `destination`.
    pub async fn suspend<Q, S>(&self, destination: &str, request: Q) -> Result<S, FlowError>
    where
        Q: Send + 'static,
        S: 'static,
    {
        Ok(self.suspender.suspend_as(destination, request).await?)
    }
}
