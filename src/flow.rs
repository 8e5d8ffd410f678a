//! The two-phase probe: initialize, then watch the event stream.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{InitializeOutcome, ProbeClient, StreamOpen};
use crate::error::ProbeError;
use crate::report::Reporter;
use crate::sse::{EventStream, SseEvent};

/// How the streaming phase ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Server closed the stream
    Completed { events: usize },
    /// Cancellation signal fired, usually Ctrl-C
    Cancelled { events: usize },
    LimitReached { events: usize },
    IdleTimeout { events: usize, after: Duration },
    /// Transport or decode error mid-stream
    Failed { events: usize, error: String },
    /// Server answered the GET with something other than 200
    Rejected { status: StatusCode, body: String },
    /// The GET never got a response
    Unreachable { error: String },
}

impl StreamOutcome {
    pub fn events(&self) -> usize {
        match self {
            Self::Completed { events }
            | Self::Cancelled { events }
            | Self::LimitReached { events }
            | Self::IdleTimeout { events, .. }
            | Self::Failed { events, .. } => *events,
            Self::Rejected { .. } | Self::Unreachable { .. } => 0,
        }
    }
}

#[derive(Debug)]
pub struct FlowSummary {
    pub initialize: InitializeOutcome,
    pub stream: StreamOutcome,
}

enum Next {
    Event(SseEvent),
    End,
    Failed(ProbeError),
    Idle(Duration),
}

async fn next_event(stream: &mut EventStream, idle_timeout: Option<Duration>) -> Next {
    let item = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, stream.next()).await {
            Ok(item) => item,
            Err(_) => return Next::Idle(limit),
        },
        None => stream.next().await,
    };
    match item {
        Some(Ok(event)) => Next::Event(event),
        Some(Err(e)) => Next::Failed(e),
        None => Next::End,
    }
}

/// Run initialize then stream, reporting every step.
///
/// Only a failure to complete the initialize request (or to write the report) is
/// returned as an error, and that includes being cancelled while it is in flight.
/// Everything that goes wrong on the stream side, cancellation included, is reported
/// and folded into the returned [`StreamOutcome`].
pub async fn run_flow<R: Reporter>(
    client: &ProbeClient,
    reporter: &mut R,
    cancel: CancellationToken,
) -> Result<FlowSummary> {
    reporter.initializing()?;
    let initialize = tokio::select! {
        biased;
        _ = cancel.cancelled() => bail!("interrupted before the initialize response arrived"),
        result = client.initialize_session() => result
            .with_context(|| format!("initialize request to {} failed", client.endpoint()))?,
    };
    reporter.initialized(&initialize)?;

    reporter.connecting()?;
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = client.stream_events(initialize.session_id.as_deref()) => Some(result),
    };
    let outcome = match opened {
        None => StreamOutcome::Cancelled { events: 0 },
        Some(Ok(StreamOpen::Events(stream))) => {
            reporter.stream_opened(StatusCode::OK)?;
            consume(stream, client, reporter, &cancel).await?
        }
        Some(Ok(StreamOpen::Rejected { status, body })) => {
            reporter.stream_rejected(status, &body)?;
            StreamOutcome::Rejected { status, body }
        }
        Some(Err(e)) => {
            warn!("Could not open SSE stream: {}", e);
            reporter.error(&e)?;
            StreamOutcome::Unreachable {
                error: e.to_string(),
            }
        }
    };

    reporter.finished(&outcome)?;
    info!("Probe finished: {:?}", outcome);
    Ok(FlowSummary {
        initialize,
        stream: outcome,
    })
}

/// Read loop. Owns the stream, so the connection is released however the loop ends.
async fn consume<R: Reporter>(
    mut stream: EventStream,
    client: &ProbeClient,
    reporter: &mut R,
    cancel: &CancellationToken,
) -> Result<StreamOutcome> {
    let config = client.config();
    let mut events = 0usize;

    let outcome = loop {
        if config.max_events.is_some_and(|max| events >= max) {
            break StreamOutcome::LimitReached { events };
        }

        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancellation requested after {} events", events);
                break StreamOutcome::Cancelled { events };
            }
            next = next_event(&mut stream, config.idle_timeout) => next,
        };

        match next {
            Next::Event(event) => {
                events += 1;
                debug!("SSE event #{}: {:?}", events, event);
                reporter.event(&event)?;
            }
            Next::End => {
                info!("Server closed the SSE stream");
                break StreamOutcome::Completed { events };
            }
            Next::Failed(e) => {
                warn!("SSE stream failed: {}", e);
                reporter.error(&e)?;
                break StreamOutcome::Failed {
                    events,
                    error: e.to_string(),
                };
            }
            Next::Idle(after) => {
                warn!("No SSE event within {:?}", after);
                break StreamOutcome::IdleTimeout { events, after };
            }
        }
    };

    drop(stream);
    Ok(outcome)
}
