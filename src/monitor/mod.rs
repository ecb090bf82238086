pub mod pressure;
pub mod runner;

pub use pressure::{evaluate, BackendReading, PressureProbe, PressureReport};
pub use runner::{MonitorState, PressureMonitor, TickOutcome};
