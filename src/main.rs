use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use mcp_flow_probe::config::{
    DEFAULT_AGENT_ID, DEFAULT_AGENT_TYPE, DEFAULT_BASE_URL, DEFAULT_ENDPOINT,
};
use mcp_flow_probe::protocol::LATEST_PROTOCOL_VERSION;
use mcp_flow_probe::{run_flow, ConsoleReporter, ProbeClient, ProbeConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Initialize an MCP session over HTTP, then print events from its SSE stream
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the MCP proxy
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Endpoint path used for both the initialize POST and the stream GET
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Value of the X-Agent-ID header
    #[arg(long, default_value = DEFAULT_AGENT_ID)]
    agent_id: String,

    /// Value of the X-Agent-Type header
    #[arg(long, default_value = DEFAULT_AGENT_TYPE)]
    agent_type: String,

    #[arg(long, default_value = LATEST_PROTOCOL_VERSION)]
    protocol_version: String,

    #[arg(long, default_value = "test-client")]
    client_name: String,

    #[arg(long, default_value = "1.0.0")]
    client_version: String,

    /// Stop after this many events
    #[arg(long)]
    max_events: Option<usize>,

    /// Seconds to wait for each event before giving up (default: wait forever)
    #[arg(long)]
    idle_timeout: Option<f64>,

    /// Seconds to wait for the TCP connection to be established
    #[arg(long)]
    connect_timeout: Option<f64>,

    /// Ignore proxy settings from the environment
    #[arg(long)]
    no_proxy: bool,

    /// Tracing filter for diagnostics written to stderr
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn seconds(value: Option<f64>) -> Result<Option<Duration>> {
    value
        .map(|secs| Duration::try_from_secs_f64(secs).map_err(anyhow::Error::from))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level)?)
        // stdout carries the report
        .with_writer(std::io::stderr)
        .init();

    let config = ProbeConfig::builder(cli.base_url)
        .with_endpoint(cli.endpoint)
        .with_agent(cli.agent_id, cli.agent_type)
        .with_protocol_version(cli.protocol_version)
        .with_client_info(cli.client_name, cli.client_version)
        .with_max_events(cli.max_events)
        .with_idle_timeout(seconds(cli.idle_timeout)?)
        .with_connect_timeout(seconds(cli.connect_timeout)?)
        .with_system_proxy(!cli.no_proxy)
        .build()?;
    debug!("Probe configuration: {:?}", config);

    let client = ProbeClient::new(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, closing connection");
            on_interrupt.cancel();
        }
    });

    let mut reporter = ConsoleReporter::stdout();
    let summary = run_flow(&client, &mut reporter, cancel).await?;
    info!(
        "Initialize status {}, {} events received",
        summary.initialize.status,
        summary.stream.events()
    );
    Ok(())
}
