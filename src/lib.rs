pub mod config;
pub mod error;
pub mod hooks;
pub mod host;
pub mod telemetry;
pub mod time;

pub use config::TelemetryConfig;
pub use error::TelemetryError;
pub use telemetry::Telemetry;
