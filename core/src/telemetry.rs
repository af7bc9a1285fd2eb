//! # Telemetry: tracing decorator for transform stages
//!
//! [`Traced`] wraps any [`Transform`] and records a span around it, plus a
//! completion event with the elapsed time and whether the stage matched.

use crate::context::FlowContext;
use crate::error::{FlowError, FlowResult};
use crate::outcome::Outcome;
use crate::transform::{Next, Transform};
use async_trait::async_trait;
use tracing::{Instrument, info_span};

#[derive(Debug, Clone)]
pub struct Traced<T> {
    inner: T,
    name: String,
}

impl<T> Traced<T> {
    pub fn new(inner: T, name: &str) -> Self {
        Self {
            inner,
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl<T, I, O> Transform<I, O> for Traced<T>
where
    T: Transform<I, O>,
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    type Request = T::Request;
    type Response = T::Response;

    async fn transform(
        &self,
        request: &I,
        cx: &FlowContext,
        next: Next<'_, Self::Request, Self::Response>,
    ) -> FlowResult<O> {
        let span = info_span!(
            "stage",
            snare.stage = %self.name,
            snare.inner = %next.label()
        );

        async move {
            tracing::trace!("entering stage");
            let start = std::time::Instant::now();

            let result = self.inner.transform(request, cx, next).await;

            let duration = start.elapsed();
            match &result {
                Ok(Outcome::Matched(_)) => tracing::debug!(?duration, "stage matched"),
                Ok(Outcome::Rejected) => tracing::debug!(?duration, "stage rejected"),
                Err(FlowError::Suspend(e)) => {
                    tracing::warn!(error = %e, ?duration, "stage suspension failed")
                }
                Err(e) => tracing::error!(error = %e, ?duration, "stage failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
