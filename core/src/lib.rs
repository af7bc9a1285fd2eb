pub mod binder;
pub mod context;
pub mod error;
pub mod flow;
pub mod matcher;
pub mod outcome;
pub mod params;
pub mod pattern;
pub mod schematic;
pub mod suspend;
pub mod telemetry;
pub mod transform;

pub use binder::{Binder, Owner, OwnerId};
pub use context::FlowContext;
pub use error::{ConfigError, FlowError, FlowResult, SuspendError};
pub use flow::Flow;
pub use matcher::{Matcher, SharedMatcher};
pub use outcome::Outcome;
pub use params::Parameters;
pub use pattern::{Mode, Pattern, PatternMatcher};
pub use schematic::{NodeKind, Schematic};
pub use suspend::{Payload, REMOTE, ResumeToken, Step, Suspender, Suspension, Task};
pub use telemetry::Traced;
pub use transform::{Identity, Next, RequestRewrite, Rewrite, Rewriting, Transform};

pub mod prelude {
    pub use crate::binder::{Binder, Owner, OwnerId};
    pub use crate::context::FlowContext;
    pub use crate::error::{FlowError, FlowResult, SuspendError};
    pub use crate::flow::Flow;
    pub use crate::matcher::{Matcher, all_of, any_of, not};
    pub use crate::outcome::Outcome;
    pub use crate::params::Parameters;
    pub use crate::pattern::{Mode, Pattern, matches_loosely, matches_strictly};
    pub use crate::suspend::{REMOTE, Step, Suspension, Task};
    pub use crate::telemetry::Traced;
    pub use crate::transform::{Identity, Next, RequestRewrite, Rewrite, Rewriting, Transform};

    pub use async_trait::async_trait;
}

/// Short type name used as a default label: the last path segment, generics kept.
pub(crate) fn type_name_of<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
    full[start..].to_string()
}
