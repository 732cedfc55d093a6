// CIM-XML over HTTP(S) implementation of the RemoteConnector port
// reason: reqwest blocking client, the probe worker is a plain OS thread
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use wbemping_core::domain::{Credentials, Endpoint};
use wbemping_core::port::{RemoteConnector, RemoteError, RemoteSession};

use crate::cim_xml::{enumerate_instances_request, parse_enumerate_response, ENUMERATE_INSTANCES};

/// Path of the CIM-XML operation endpoint on a WBEM server
pub const CIMOM_PATH: &str = "/cimom";

/// First message id used by a session
const FIRST_MESSAGE_ID: u64 = 1001;

/// Last CIM-XML request and reply seen by a connector's sessions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CimExchange {
    pub request: String,
    /// Status line and body; `None` while the reply is outstanding or if the call failed in transport
    pub reply: Option<String>,
}

type ExchangeSlot = Arc<Mutex<Option<CimExchange>>>;

/// Connector speaking CIM-XML over HTTP(S)
pub struct CimXmlConnector {
    io_timeout: Option<Duration>,
    verify_cert: bool,
    exchange: Option<ExchangeSlot>,
}

impl CimXmlConnector {
    /// Create a new connector
    ///
    /// # Arguments
    /// * `io_timeout` - Per-request I/O timeout; `None` lets a call block indefinitely
    /// * `verify_cert` - Verify the server TLS certificate
    ///
    /// # Example
    /// ```ignore
    /// let connector = CimXmlConnector::new(Some(Duration::from_secs(20)), false);
    /// ```
    pub fn new(io_timeout: Option<Duration>, verify_cert: bool) -> Self {
        Self {
            io_timeout,
            verify_cert,
            exchange: None,
        }
    }

    /// Keep the last request and reply for [`CimXmlConnector::last_exchange`]
    pub fn with_exchange_capture(mut self) -> Self {
        self.exchange = Some(Arc::new(Mutex::new(None)));
        self
    }

    /// Last exchange recorded by any session of this connector
    pub fn last_exchange(&self) -> Option<CimExchange> {
        self.exchange.as_ref().and_then(|slot| {
            slot.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }
}

impl RemoteConnector for CimXmlConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, RemoteError> {
        let mut builder = Client::builder()
            .user_agent(concat!("wbemping/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!self.verify_cert)
            .timeout(self.io_timeout);
        if let Some(io_timeout) = self.io_timeout {
            builder = builder.connect_timeout(io_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| RemoteError::Internal(error_chain(&e)))?;

        let url = format!("{}{}", endpoint.url(), CIMOM_PATH);
        info!(
            url = %url,
            namespace = %endpoint.namespace(),
            principal = %credentials.principal(),
            io_timeout_ms = ?self.io_timeout.map(|t| t.as_millis()),
            "Opening CIM-XML session"
        );

        Ok(Box::new(CimXmlSession {
            client,
            url,
            namespace: endpoint.namespace().to_string(),
            credentials: credentials.clone(),
            next_message_id: FIRST_MESSAGE_ID,
            exchange: self.exchange.clone(),
        }))
    }
}

/// Stateless CIM-XML session: one HTTP client plus credentials
struct CimXmlSession {
    client: Client,
    url: String,
    namespace: String,
    credentials: Credentials,
    next_message_id: u64,
    exchange: Option<ExchangeSlot>,
}

impl CimXmlSession {
    fn record(&self, update: impl FnOnce(&mut Option<CimExchange>)) {
        if let Some(slot) = &self.exchange {
            update(&mut slot.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }
}

impl RemoteSession for CimXmlSession {
    fn enumerate_instances(&mut self, class_name: &str) -> Result<usize, RemoteError> {
        let message_id = self.next_message_id;
        self.next_message_id += 1;

        let body = enumerate_instances_request(message_id, &self.namespace, class_name);
        self.record(|slot| {
            *slot = Some(CimExchange {
                request: body.clone(),
                reply: None,
            })
        });

        let response = self
            .client
            .post(&self.url)
            .basic_auth(self.credentials.principal(), Some(self.credentials.secret()))
            .header("Content-Type", "application/xml; charset=\"utf-8\"")
            .header("CIMOperation", "MethodCall")
            .header("CIMMethod", ENUMERATE_INSTANCES)
            .header("CIMObject", self.namespace.as_str())
            .body(body)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        debug!(url = %self.url, status = %status, message_id, "CIM-XML response received");

        let cim_error = response
            .headers()
            .get("CIMError")
            .map(|value| value.to_str().unwrap_or("<non-ascii>").to_string());
        let text = response.text().map_err(transport_error)?;
        self.record(|slot| {
            if let Some(exchange) = slot.as_mut() {
                exchange.reply = Some(format!("HTTP {}\n\n{}", status, text));
            }
        });

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Authentication(format!("HTTP {}", status)));
        }
        if let Some(value) = cim_error {
            return Err(RemoteError::Protocol(format!(
                "HTTP {}, CIMError header: {}",
                status, value
            )));
        }
        if !status.is_success() {
            return Err(RemoteError::Protocol(format!("HTTP {}", status)));
        }

        parse_enumerate_response(&text)
    }

    fn close(self: Box<Self>) -> Result<(), RemoteError> {
        // HTTP is stateless; dropping the client releases pooled connections
        debug!(url = %self.url, "Closing CIM-XML session");
        Ok(())
    }
}

/// Classify a reqwest error
fn transport_error(err: reqwest::Error) -> RemoteError {
    let detail = error_chain(&err);
    if err.is_timeout() {
        RemoteError::Timeout(detail)
    } else if err.is_connect() {
        RemoteError::Connection(detail)
    } else if err.is_builder() {
        RemoteError::Internal(detail)
    } else {
        RemoteError::Protocol(detail)
    }
}

/// Render an error with all its sources ("a: b: c")
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
