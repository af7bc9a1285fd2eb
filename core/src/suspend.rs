//! # Suspension: explicit suspend/resume of a flow evaluation
//!
//! A flow evaluation is a resumable computation. When a branch needs the outside
//! world (typically the real upstream round trip) it calls [`Suspender::suspend`],
//! and the evaluation pauses. The driver observes this as a [`Step::Suspended`]
//! carrying the destination tag, the outgoing payload and a [`ResumeToken`].
//! Handing the result back through [`Task::resume`] lets the computation continue
//! exactly where it paused.
//!
//! The protocol is a visible state machine:
//!
//! ```text
//! Idle --suspend--> Requested --Task::step--> Outstanding --Task::resume--> Resumed --poll--> Idle
//! ```
//!
//! At most one suspension is outstanding per task. Dropping a `suspend` future
//! before it completes returns the slot to `Idle`.

use crate::error::{FlowError, SuspendError};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::any::{Any, type_name};
use std::fmt;
use std::future::{Future, poll_fn};
use std::sync::Arc;
use std::task::Poll;

/// Destination tag for the genuine upstream round trip.
pub const REMOTE: &str = "remote";

/// Type-erased message crossing the suspension boundary in either direction.
pub type Payload = Box<dyn Any + Send>;

/// Identifies one suspension of one task. Tokens are never reused within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResumeToken(u64);

impl ResumeToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A paused computation's request to the driver.
pub struct Suspension {
    destination: String,
    payload: Payload,
    token: ResumeToken,
}

impl Suspension {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn token(&self) -> ResumeToken {
        self.token
    }

    pub fn is_remote(&self) -> bool {
        self.destination == REMOTE
    }

    pub fn payload_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Takes the payload out as a concrete type.
    pub fn into_payload<T: 'static>(self) -> Result<T, SuspendError> {
        self.payload
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| SuspendError::PayloadType {
                expected: type_name::<T>(),
            })
    }

    pub fn into_parts(self) -> (String, Payload, ResumeToken) {
        (self.destination, self.payload, self.token)
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("destination", &self.destination)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

enum Slot {
    Idle,
    Requested(Suspension),
    Outstanding(ResumeToken),
    Resumed(ResumeToken, Payload),
}

struct Shared {
    slot: Slot,
    issued: u64,
}

/// Handle through which a running evaluation suspends itself.
#[derive(Clone)]
pub struct Suspender {
    shared: Arc<Mutex<Shared>>,
}

impl Suspender {
    fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                slot: Slot::Idle,
                issued: 0,
            })),
        }
    }

    /// Number of suspensions issued so far by this computation.
    pub fn issued(&self) -> u64 {
        self.shared.lock().issued
    }

    /// Pauses the computation until the driver resumes it with a value.
    pub async fn suspend(
        &self,
        destination: impl Into<String>,
        payload: Payload,
    ) -> Result<Payload, SuspendError> {
        let token = {
            let mut shared = self.shared.lock();
            if !matches!(shared.slot, Slot::Idle) {
                return Err(SuspendError::AlreadyOutstanding);
            }
            shared.issued += 1;
            let token = ResumeToken(shared.issued);
            shared.slot = Slot::Requested(Suspension {
                destination: destination.into(),
                payload,
                token,
            });
            token
        };
        let _abandon = AbandonGuard {
            shared: &self.shared,
            token,
        };

        poll_fn(|_cx| {
            let mut shared = self.shared.lock();
            match std::mem::replace(&mut shared.slot, Slot::Idle) {
                Slot::Resumed(resumed, value) if resumed == token => Poll::Ready(Ok(value)),
                other => {
                    shared.slot = other;
                    Poll::Pending
                }
            }
        })
        .await
    }

    /// Typed form of [`suspend`](Self::suspend).
    pub async fn suspend_as<Q, S>(&self, destination: &str, request: Q) -> Result<S, SuspendError>
    where
        Q: Send + 'static,
        S: 'static,
    {
        let value = self.suspend(destination, Box::new(request)).await?;
        value
            .downcast::<S>()
            .map(|boxed| *boxed)
            .map_err(|_| SuspendError::PayloadType {
                expected: type_name::<S>(),
            })
    }

    fn take_requested(&self) -> Option<Suspension> {
        let mut shared = self.shared.lock();
        match std::mem::replace(&mut shared.slot, Slot::Idle) {
            Slot::Requested(suspension) => {
                shared.slot = Slot::Outstanding(suspension.token);
                Some(suspension)
            }
            other => {
                shared.slot = other;
                None
            }
        }
    }

    fn outstanding(&self) -> Option<ResumeToken> {
        match self.shared.lock().slot {
            Slot::Outstanding(token) => Some(token),
            _ => None,
        }
    }
}

/// Clears the slot when a pending `suspend` future is dropped.
struct AbandonGuard<'a> {
    shared: &'a Mutex<Shared>,
    token: ResumeToken,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        let owned = match &shared.slot {
            Slot::Idle => false,
            Slot::Requested(suspension) => suspension.token == self.token,
            Slot::Outstanding(token) | Slot::Resumed(token, _) => *token == self.token,
        };
        if owned {
            tracing::debug!(token = self.token.id(), "suspension abandoned");
            shared.slot = Slot::Idle;
        }
    }
}

impl fmt::Debug for Suspender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspender")
            .field("issued", &self.issued())
            .finish()
    }
}

/// What a driver observes after advancing a [`Task`].
#[derive(Debug)]
pub enum Step<T> {
    Suspended(Suspension),
    Complete(Result<T, FlowError>),
}

/// A resumable evaluation of one request.
///
/// Dropping a task abandons it; an abandoned task can never be resumed.
pub struct Task<'a, T> {
    future: Option<BoxFuture<'a, Result<T, FlowError>>>,
    suspender: Suspender,
}

impl<'a, T> Task<'a, T> {
    /// Builds a task from a computation that receives its own [`Suspender`].
    pub fn new<F, Fut>(computation: F) -> Self
    where
        F: FnOnce(Suspender) -> Fut,
        Fut: Future<Output = Result<T, FlowError>> + Send + 'a,
    {
        let suspender = Suspender::new();
        let future = computation(suspender.clone());
        Self {
            future: Some(Box::pin(future)),
            suspender,
        }
    }

    /// Runs the computation until it either suspends or finishes.
    ///
    /// Calling this while a suspension is still waiting for its resume value is a
    /// contract violation and fails with [`SuspendError::AwaitingResume`].
    pub async fn step(&mut self) -> Result<Step<T>, SuspendError> {
        if let Some(token) = self.suspender.outstanding() {
            return Err(SuspendError::AwaitingResume(token.id()));
        }
        let Some(future) = self.future.as_mut() else {
            return Err(SuspendError::Finished);
        };
        let suspender = &self.suspender;

        let step = poll_fn(|cx| match future.as_mut().poll(cx) {
            Poll::Ready(result) => Poll::Ready(Step::Complete(result)),
            Poll::Pending => match suspender.take_requested() {
                Some(suspension) => Poll::Ready(Step::Suspended(suspension)),
                None => Poll::Pending,
            },
        })
        .await;

        if matches!(step, Step::Complete(_)) {
            self.future = None;
        }
        Ok(step)
    }

    /// Supplies the outcome of the outstanding suspension identified by `token`.
    pub fn resume(&mut self, token: ResumeToken, value: Payload) -> Result<(), SuspendError> {
        if self.future.is_none() {
            return Err(SuspendError::Finished);
        }
        let mut shared = self.suspender.shared.lock();
        match shared.slot {
            Slot::Outstanding(expected) if expected == token => {
                shared.slot = Slot::Resumed(token, value);
                Ok(())
            }
            Slot::Outstanding(expected) => Err(SuspendError::StaleToken {
                expected: expected.id(),
                got: token.id(),
            }),
            _ => Err(SuspendError::NotSuspended),
        }
    }

    pub fn resume_with<S: Send + 'static>(
        &mut self,
        token: ResumeToken,
        value: S,
    ) -> Result<(), SuspendError> {
        self.resume(token, Box::new(value))
    }

    pub fn is_finished(&self) -> bool {
        self.future.is_none()
    }

    /// Number of suspensions the computation has issued so far.
    pub fn suspensions(&self) -> u64 {
        self.suspender.issued()
    }
}

impl<T> fmt::Debug for Task<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("finished", &self.is_finished())
            .field("suspender", &self.suspender)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::{Either, ready, select};

    fn echo_task<'a>() -> Task<'a, String> {
        Task::new(|suspender| async move {
            let first: String = suspender.suspend_as(REMOTE, "ping".to_string()).await?;
            let second: String = suspender.suspend_as("audit", first.clone()).await?;
            Ok(format!("{first}/{second}"))
        })
    }

    #[tokio::test]
    async fn test_dropped_suspend_future_frees_the_slot() {
        let mut task = Task::new(|suspender| async move {
            let slow = Box::pin(suspender.suspend_as::<_, String>("slow", ()));
            match select(slow, ready(())).await {
                Either::Left(_) => panic!("nobody resumed the slow suspension"),
                Either::Right(((), pending)) => drop(pending),
            }
            let reply: String = suspender.suspend_as("fast", ()).await?;
            Ok::<_, FlowError>(reply)
        });

        let Step::Suspended(suspension) = task.step().await.unwrap() else {
            panic!("expected a suspension");
        };
        assert_eq!(suspension.destination(), "fast");
        task.resume_with(suspension.token(), "done".to_string()).unwrap();
        match task.step().await.unwrap() {
            Step::Complete(result) => assert_eq!(result.unwrap(), "done"),
            Step::Suspended(s) => panic!("unexpected suspension to {}", s.destination()),
        }
        assert_eq!(task.suspensions(), 2);
    }

    #[tokio::test]
    async fn test_suspend_and_resume_in_sequence() {
        let mut task = echo_task();

        let Step::Suspended(first) = task.step().await.unwrap() else {
            panic!("expected a suspension");
        };
        assert_eq!(first.destination(), REMOTE);
        assert_eq!(first.payload_ref::<String>().map(String::as_str), Some("ping"));
        task.resume_with(first.token(), "pong".to_string()).unwrap();

        let Step::Suspended(second) = task.step().await.unwrap() else {
            panic!("expected a second suspension");
        };
        assert_eq!(second.destination(), "audit");
        assert_ne!(first.token(), second.token());
        task.resume_with(second.token(), "logged".to_string()).unwrap();

        match task.step().await.unwrap() {
            Step::Complete(result) => assert_eq!(result.unwrap(), "pong/logged"),
            Step::Suspended(_) => panic!("expected completion"),
        }
        assert!(task.is_finished());
        assert_eq!(task.suspensions(), 2);
    }

    #[tokio::test]
    async fn test_resume_without_suspension_is_rejected() {
        let mut task = echo_task();
        let err = task
            .resume(ResumeToken(1), Box::new("early".to_string()))
            .unwrap_err();
        assert_eq!(err, SuspendError::NotSuspended);
    }

    #[tokio::test]
    async fn test_double_resume_is_rejected() {
        let mut task = echo_task();
        let Step::Suspended(first) = task.step().await.unwrap() else {
            panic!("expected a suspension");
        };
        task.resume_with(first.token(), "pong".to_string()).unwrap();
        let err = task
            .resume_with(first.token(), "again".to_string())
            .unwrap_err();
        assert_eq!(err, SuspendError::NotSuspended);
    }

    #[tokio::test]
    async fn test_stale_token_and_step_while_awaiting() {
        let mut task = echo_task();
        let Step::Suspended(first) = task.step().await.unwrap() else {
            panic!("expected a suspension");
        };

        let err = task.step().await.unwrap_err();
        assert_eq!(err, SuspendError::AwaitingResume(first.token().id()));

        let err = task
            .resume_with(ResumeToken(first.token().id() + 7), "x".to_string())
            .unwrap_err();
        assert!(matches!(err, SuspendError::StaleToken { .. }));
    }

    #[tokio::test]
    async fn test_wrong_payload_type_faults_the_computation() {
        let mut task = echo_task();
        let Step::Suspended(first) = task.step().await.unwrap() else {
            panic!("expected a suspension");
        };
        task.resume_with(first.token(), 42u32).unwrap();
        match task.step().await.unwrap() {
            Step::Complete(Err(FlowError::Suspend(SuspendError::PayloadType { .. }))) => {}
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overlapping_suspension_is_refused() {
        let mut task: Task<'_, ()> = Task::new(|suspender| async move {
            let first = suspender.suspend(REMOTE, Box::new(1u8));
            let second = suspender.suspend(REMOTE, Box::new(2u8));
            let (a, b) = futures_util::future::join(first, second).await;
            a?;
            b?;
            Ok(())
        });

        let Step::Suspended(first) = task.step().await.unwrap() else {
            panic!("expected a suspension");
        };
        task.resume_with(first.token(), ()).unwrap();
        match task.step().await.unwrap() {
            Step::Complete(Err(FlowError::Suspend(SuspendError::AlreadyOutstanding))) => {}
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_finished_task_cannot_step_or_resume() {
        let mut task: Task<'_, u8> = Task::new(|_| async { Ok(7) });
        assert!(matches!(task.step().await.unwrap(), Step::Complete(Ok(7))));
        assert_eq!(task.step().await.unwrap_err(), SuspendError::Finished);
        assert_eq!(
            task.resume_with(ResumeToken(1), 0u8).unwrap_err(),
            SuspendError::Finished
        );
    }
}
