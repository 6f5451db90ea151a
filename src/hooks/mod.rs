pub mod auto;
pub mod frame;
pub mod lifecycle;

pub use auto::{ensure_auto_instrumentation, instrument_component, AutoInstrumentor, Instrumented, OptionsFactory};
pub use frame::{FrameInstrumentation, FrameOptions};
pub use lifecycle::{diff_tracked_values, ComponentInstrumentation, ComponentOptions, SnapshotProducer, ValueChange};
