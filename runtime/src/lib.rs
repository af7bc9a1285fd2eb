pub mod engine;
pub mod error;
pub mod instance;
pub mod settings;
pub mod telemetry;

pub mod prelude {
    pub use crate::engine::{Engine, Router, ScriptedTransport, Transport};
    pub use crate::error::EngineError;
    pub use crate::instance::ProxyInstance;
    pub use crate::settings::{LogSettings, Settings};
}

pub use engine::{Engine, Router, ScriptedTransport, Transport};
pub use error::EngineError;
pub use instance::ProxyInstance;
pub use settings::{LogSettings, Settings};
