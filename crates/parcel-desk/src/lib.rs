pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod telemetry;
pub mod workflows;
