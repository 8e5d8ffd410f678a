use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};
use crate::protocol::{
    InitializeRequest, ACCEPT_JSON_OR_EVENT_STREAM, AGENT_ID_HEADER, AGENT_TYPE_HEADER,
    MIME_EVENT_STREAM, MIME_JSON, SESSION_ID_HEADER,
};
use crate::sse::EventStream;

/// Raw result of the `initialize` POST. Any status code is a valid outcome.
#[derive(Debug)]
pub struct InitializeOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    pub session_id: Option<String>,
}

/// What came back when asking for the event stream
pub enum StreamOpen {
    Events(EventStream),
    Rejected { status: StatusCode, body: String },
}

impl std::fmt::Debug for StreamOpen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Events(_) => f.write_str("Events(..)"),
            Self::Rejected { status, body } => f
                .debug_struct("Rejected")
                .field("status", status)
                .field("body", body)
                .finish(),
        }
    }
}

/// HTTP side of the probe: one initialize POST, one streaming GET, same endpoint.
#[derive(Clone)]
pub struct ProbeClient {
    http: reqwest::Client,
    endpoint: Url,
    config: ProbeConfig,
}

impl ProbeClient {
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        // No overall request timeout: it would cut the event stream off mid-read.
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            http: builder.build()?,
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn initialize_request(&self) -> InitializeRequest {
        InitializeRequest::new(
            self.config.protocol_version.clone(),
            self.config.client_info.clone(),
        )
    }

    /// POST the `initialize` request and capture whatever comes back.
    ///
    /// Transport failures are returned as errors; HTTP error statuses are not.
    pub async fn initialize_session(&self) -> Result<InitializeOutcome> {
        let request = self.initialize_request();
        let payload = serde_json::to_string(&request)?;
        info!("Initializing MCP session at {}", self.endpoint);
        debug!("Initialize request: {}", payload);

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, MIME_JSON)
            .header(ACCEPT, ACCEPT_JSON_OR_EVENT_STREAM)
            .header(AGENT_ID_HEADER, self.agent_header(&self.config.agent_id, AGENT_ID_HEADER)?)
            .header(
                AGENT_TYPE_HEADER,
                self.agent_header(&self.config.agent_type, AGENT_TYPE_HEADER)?,
            )
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let session_id = session_id_from(&headers);
        let body = response.text().await?;

        debug!("Initialize response {}: {}", status, body);
        match &session_id {
            Some(id) => info!("Session established: {}", id),
            None => debug!("No {} header in initialize response", SESSION_ID_HEADER),
        }

        Ok(InitializeOutcome {
            status,
            headers,
            body,
            session_id,
        })
    }

    /// Open the event stream, forwarding the session id when there is one.
    ///
    /// A 200 response yields an [`EventStream`]; any other status is read to the end
    /// and handed back without attempting to parse events.
    pub async fn stream_events(&self, session_id: Option<&str>) -> Result<StreamOpen> {
        let mut request = self
            .http
            .get(self.endpoint.clone())
            .header(ACCEPT, MIME_EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .header(AGENT_ID_HEADER, self.agent_header(&self.config.agent_id, AGENT_ID_HEADER)?);

        if let Some(id) = session_id {
            let value = HeaderValue::from_str(id)
                .map_err(|e| ProbeError::invalid_header(SESSION_ID_HEADER, e))?;
            request = request.header(SESSION_ID_HEADER, value);
        }

        info!("Opening SSE stream at {}", self.endpoint);
        let response = request.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await?;
            warn!("SSE stream refused with status {}", status);
            return Ok(StreamOpen::Rejected { status, body });
        }

        debug!("SSE stream open, content-type {:?}", response.headers().get(CONTENT_TYPE));
        Ok(StreamOpen::Events(EventStream::from_response(response)))
    }

    fn agent_header(&self, value: &str, name: &'static str) -> Result<HeaderValue> {
        HeaderValue::from_str(value).map_err(|e| ProbeError::invalid_header(name, e))
    }
}

/// Session id from response headers. Header names are matched case-insensitively.
pub fn session_id_from(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(SESSION_ID_HEADER)?;
    match value.to_str() {
        Ok(id) => Some(id.to_string()),
        Err(_) => {
            warn!("Ignoring non-ASCII {} header", SESSION_ID_HEADER);
            None
        }
    }
}
