//! Human-readable output for a probe run.

use std::io::{self, Stdout, Write};

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::client::InitializeOutcome;
use crate::error::ProbeError;
use crate::flow::StreamOutcome;
use crate::sse::SseEvent;

const EVENT_SEPARATOR: &str = "----------------------------------------";

/// Receives each step of a probe run as it happens
pub trait Reporter {
    fn initializing(&mut self) -> io::Result<()>;
    fn initialized(&mut self, outcome: &InitializeOutcome) -> io::Result<()>;
    fn connecting(&mut self) -> io::Result<()>;
    fn stream_opened(&mut self, status: StatusCode) -> io::Result<()>;
    fn stream_rejected(&mut self, status: StatusCode, body: &str) -> io::Result<()>;
    fn event(&mut self, event: &SseEvent) -> io::Result<()>;
    fn error(&mut self, error: &ProbeError) -> io::Result<()>;
    fn finished(&mut self, outcome: &StreamOutcome) -> io::Result<()>;
}

/// Writes the report as plain text, by default to stdout
pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_headers(headers: &HeaderMap) -> String {
    let pairs: Vec<String> = headers
        .iter()
        .map(|(name, value)| {
            format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()))
        })
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn initializing(&mut self) -> io::Result<()> {
        writeln!(self.out, "=== Testing MCP Streamable HTTP Flow ===\n")?;
        writeln!(self.out, "1. Initializing MCP session...")?;
        self.out.flush()
    }

    fn initialized(&mut self, outcome: &InitializeOutcome) -> io::Result<()> {
        writeln!(self.out, "Status: {}", outcome.status.as_u16())?;
        writeln!(self.out, "Headers: {}", format_headers(&outcome.headers))?;
        writeln!(self.out, "Response: {}\n", outcome.body)?;
        if let Some(id) = &outcome.session_id {
            writeln!(self.out, "Session ID: {}\n", id)?;
        }
        self.out.flush()
    }

    fn connecting(&mut self) -> io::Result<()> {
        writeln!(self.out, "2. Establishing SSE connection...")?;
        self.out.flush()
    }

    fn stream_opened(&mut self, status: StatusCode) -> io::Result<()> {
        writeln!(self.out, "SSE Status: {}", status.as_u16())?;
        writeln!(self.out, "SSE connection established. Listening for events...\n")?;
        self.out.flush()
    }

    fn stream_rejected(&mut self, status: StatusCode, body: &str) -> io::Result<()> {
        writeln!(self.out, "SSE Status: {}", status.as_u16())?;
        writeln!(
            self.out,
            "Failed to establish SSE connection: {}",
            status.as_u16()
        )?;
        writeln!(self.out, "Response: {}", body)?;
        self.out.flush()
    }

    fn event(&mut self, event: &SseEvent) -> io::Result<()> {
        writeln!(self.out, "Event: {}", event.event)?;
        writeln!(self.out, "Data: {}", event.data)?;
        writeln!(self.out, "ID: {}", event.id)?;
        writeln!(self.out, "{}", EVENT_SEPARATOR)?;
        self.out.flush()
    }

    fn error(&mut self, error: &ProbeError) -> io::Result<()> {
        writeln!(self.out, "Error: {}", error)?;
        self.out.flush()
    }

    fn finished(&mut self, outcome: &StreamOutcome) -> io::Result<()> {
        match outcome {
            StreamOutcome::Cancelled { .. } => writeln!(self.out, "\nConnection closed by user")?,
            StreamOutcome::LimitReached { events } => {
                writeln!(self.out, "Stopped after {} events", events)?
            }
            StreamOutcome::IdleTimeout { after, .. } => writeln!(
                self.out,
                "No event received for {:.1}s, closing connection",
                after.as_secs_f64()
            )?,
            _ => {}
        }
        self.out.flush()
    }
}
