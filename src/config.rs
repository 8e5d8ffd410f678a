use std::time::Duration;

use url::Url;

use crate::error::{ProbeError, Result};
use crate::protocol::{ClientInfo, LATEST_PROTOCOL_VERSION};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_ENDPOINT: &str = "/mcp/messages";
pub const DEFAULT_AGENT_ID: &str = "test-agent";
pub const DEFAULT_AGENT_TYPE: &str = "test";

/// Everything the prober needs to know about the target and how to talk to it.
///
/// Built through [`ProbeConfig::builder`]; the base URL is validated at build time so
/// the prober itself never has to deal with malformed targets.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub base_url: Url,
    pub endpoint: String,
    pub agent_id: String,
    pub agent_type: String,
    pub protocol_version: String,
    pub client_info: ClientInfo,
    /// Stop reading the stream after this many events
    pub max_events: Option<usize>,
    /// Longest wait for the next event; `None` blocks until the server closes
    pub idle_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    /// Honour HTTP(S)_PROXY / NO_PROXY from the environment
    pub use_system_proxy: bool,
}

impl ProbeConfig {
    pub fn builder(base_url: impl Into<String>) -> ProbeConfigBuilder {
        ProbeConfigBuilder::new(base_url)
    }

    /// Resolve the endpoint path against the base URL.
    ///
    /// An absolute endpoint path replaces whatever path the base URL carries, so
    /// `http://host:8080/` and `http://host:8080` resolve to the same endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        Ok(self.base_url.join(&self.endpoint)?)
    }
}

pub struct ProbeConfigBuilder {
    base_url: String,
    endpoint: String,
    agent_id: String,
    agent_type: String,
    protocol_version: String,
    client_info: ClientInfo,
    max_events: Option<usize>,
    idle_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    use_system_proxy: bool,
}

impl ProbeConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            agent_id: DEFAULT_AGENT_ID.to_string(),
            agent_type: DEFAULT_AGENT_TYPE.to_string(),
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            client_info: ClientInfo::default(),
            max_events: None,
            idle_timeout: None,
            connect_timeout: None,
            use_system_proxy: true,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>, agent_type: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self.agent_type = agent_type.into();
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = ClientInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    pub fn with_max_events(mut self, max_events: Option<usize>) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.use_system_proxy = enabled;
        self
    }

    pub fn build(self) -> Result<ProbeConfig> {
        let base_url = Url::parse(&self.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ProbeError::Config(format!(
                "base URL {} cannot carry a path",
                self.base_url
            )));
        }
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ProbeError::Config(format!(
                "unsupported scheme {} in base URL",
                base_url.scheme()
            )));
        }
        if self.max_events == Some(0) {
            return Err(ProbeError::Config(
                "max events must be at least 1".to_string(),
            ));
        }
        if self.idle_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ProbeError::Config(
                "idle timeout must be greater than zero".to_string(),
            ));
        }

        Ok(ProbeConfig {
            base_url,
            endpoint: self.endpoint,
            agent_id: self.agent_id,
            agent_type: self.agent_type,
            protocol_version: self.protocol_version,
            client_info: self.client_info,
            max_events: self.max_events,
            idle_timeout: self.idle_timeout,
            connect_timeout: self.connect_timeout,
            use_system_proxy: self.use_system_proxy,
        })
    }
}
