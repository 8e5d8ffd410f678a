pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod protocol;
pub mod report;
pub mod sse;

pub use client::{InitializeOutcome, ProbeClient, StreamOpen};
pub use config::{ProbeConfig, ProbeConfigBuilder};
pub use error::{ProbeError, Result};
pub use flow::{run_flow, FlowSummary, StreamOutcome};
pub use report::{ConsoleReporter, Reporter};
pub use sse::{EventStream, SseEvent};
