//! HTTP transport for a browser-automation sidecar process.
//!
//! Commands go out over HTTP:
//!
//! - `POST {base}/sessions/{account}/start` with `{accountId, sessionPath}`
//! - `DELETE {base}/sessions/{account}`
//!
//! Events come back through the daemon's webhook and are fed in with
//! [`SidecarTransport::ingest`].

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sessionkeeper_types::{SidecarConfig, TransportError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{classify_message, Transport, TransportEvent, EVENT_CHANNEL_CAPACITY};

/// Event pushed by the sidecar to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarEvent {
    Qr {
        #[serde(rename = "accountId")]
        account_id: String,
        qr: String,
    },
    Ready {
        #[serde(rename = "accountId")]
        account_id: String,
        #[serde(default)]
        pid: Option<u32>,
    },
    Disconnected {
        #[serde(rename = "accountId")]
        account_id: String,
        reason: String,
    },
    Error {
        #[serde(rename = "accountId")]
        account_id: String,
        message: String,
    },
}

impl SidecarEvent {
    pub fn account_id(&self) -> &str {
        match self {
            Self::Qr { account_id, .. }
            | Self::Ready { account_id, .. }
            | Self::Disconnected { account_id, .. }
            | Self::Error { account_id, .. } => account_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest<'a> {
    account_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_path: Option<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
struct StartResponse {
    #[serde(default)]
    pid: Option<u32>,
    #[serde(default)]
    ready: bool,
}

const NO_PID: u32 = 0;

/// Transport backed by a sidecar session.
pub struct SidecarTransport {
    account_id: String,
    session_path: Option<String>,
    base_url: String,
    client: reqwest::Client,
    events: broadcast::Sender<TransportEvent>,
    ready: AtomicBool,
    session_open: AtomicBool,
    pid: AtomicU32,
}

impl SidecarTransport {
    pub fn new(
        account_id: impl Into<String>,
        session_path: Option<String>,
        config: &SidecarConfig,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::critical(format!("failed to build HTTP client: {e}")))?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            account_id: account_id.into(),
            session_path,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            events,
            ready: AtomicBool::new(false),
            session_open: AtomicBool::new(false),
            pid: AtomicU32::new(NO_PID),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn session_url(&self) -> String {
        format!("{}/sessions/{}", self.base_url, self.account_id)
    }

    /// Feed an event received from the sidecar webhook.
    pub fn ingest(&self, event: SidecarEvent) {
        let mapped = match event {
            SidecarEvent::Qr { qr, .. } => {
                self.session_open.store(true, Ordering::SeqCst);
                self.ready.store(false, Ordering::SeqCst);
                TransportEvent::Qr(qr)
            },
            SidecarEvent::Ready { pid, .. } => {
                self.session_open.store(true, Ordering::SeqCst);
                self.ready.store(true, Ordering::SeqCst);
                if let Some(pid) = pid {
                    self.pid.store(pid, Ordering::SeqCst);
                }
                TransportEvent::Ready
            },
            SidecarEvent::Disconnected { reason, .. } => {
                self.ready.store(false, Ordering::SeqCst);
                TransportEvent::Disconnected(reason)
            },
            SidecarEvent::Error { message, .. } => TransportEvent::Error(classify_message(&message)),
        };

        debug!(account_id = %self.account_id, event = ?mapped, "sidecar event");
        // No subscribers yet is fine: state flags above already reflect the event.
        let _ = self.events.send(mapped);
    }

    async fn failure_from_response(response: reqwest::Response) -> TransportError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message =
            if body.trim().is_empty() { format!("sidecar returned HTTP {status}") } else { body };
        classify_message(&message)
    }
}

#[async_trait]
impl Transport for SidecarTransport {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn has_session(&self) -> bool {
        self.session_open.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> Result<(), TransportError> {
        let url = format!("{}/start", self.session_url());
        info!(account_id = %self.account_id, url = %url, "starting sidecar session");

        let response = self
            .client
            .post(&url)
            .json(&StartRequest {
                account_id: &self.account_id,
                session_path: self.session_path.as_deref(),
            })
            .send()
            .await
            .map_err(|e| classify_message(&e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::failure_from_response(response).await);
        }

        let started = match response.json::<StartResponse>().await {
            Ok(started) => started,
            Err(e) => {
                warn!(
                    account_id = %self.account_id,
                    error = %e,
                    "unreadable start response, assuming no pid"
                );
                StartResponse::default()
            },
        };
        self.session_open.store(true, Ordering::SeqCst);
        if let Some(pid) = started.pid {
            self.pid.store(pid, Ordering::SeqCst);
        }
        if started.ready {
            self.ready.store(true, Ordering::SeqCst);
            let _ = self.events.send(TransportEvent::Ready);
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        self.ready.store(false, Ordering::SeqCst);
        let was_open = self.session_open.swap(false, Ordering::SeqCst);
        self.pid.store(NO_PID, Ordering::SeqCst);

        let response = self
            .client
            .delete(self.session_url())
            .send()
            .await
            .map_err(|e| classify_message(&e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            debug!(account_id = %self.account_id, was_open, "sidecar session destroyed");
            return Ok(());
        }

        let err = Self::failure_from_response(response).await;
        warn!(account_id = %self.account_id, error = %err, "sidecar teardown failed");
        Err(err)
    }

    fn browser_pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            NO_PID => None,
            pid => Some(pid),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sessionkeeper_types::ErrorClass;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> SidecarTransport {
        let config = SidecarConfig { base_url: server.uri(), request_timeout_secs: 5 };
        SidecarTransport::new("sales", Some("/data/sales".to_string()), &config).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_records_pid_and_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/sales/start"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"pid": 4242})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        transport.initialize().await.unwrap();

        assert!(transport.has_session());
        assert!(!transport.is_ready());
        assert_eq!(transport.browser_pid(), Some(4242));
    }

    #[tokio::test]
    async fn test_initialize_accepts_unparseable_start_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/sales/start"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let mut rx = transport.subscribe();
        transport.initialize().await.unwrap();

        assert!(transport.has_session());
        assert!(!transport.is_ready());
        assert_eq!(transport.browser_pid(), None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_initialize_failure_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/sales/start"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string("The browser is already running for /data/sales"),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server).initialize().await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::LockConflict);
    }

    #[tokio::test]
    async fn test_destroy_tolerates_missing_session() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/sessions/sales"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        assert!(transport.destroy().await.is_ok());
        assert!(!transport.has_session());
    }

    #[tokio::test]
    async fn test_ingest_updates_flags_and_broadcasts() {
        let server = MockServer::start().await;
        let transport = transport_for(&server);
        let mut rx = transport.subscribe();

        transport.ingest(SidecarEvent::Ready { account_id: "sales".to_string(), pid: Some(7) });
        assert!(transport.is_ready());
        assert_eq!(transport.browser_pid(), Some(7));
        assert_eq!(rx.recv().await.unwrap(), TransportEvent::Ready);

        transport.ingest(SidecarEvent::Error {
            account_id: "sales".to_string(),
            message: "Protocol error: Target closed".to_string(),
        });
        match rx.recv().await.unwrap() {
            TransportEvent::Error(err) => assert_eq!(err.class(), ErrorClass::Transient),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_webhook_payload_shape() {
        let event: SidecarEvent =
            serde_json::from_str(r#"{"type":"qr","accountId":"sales","qr":"2@abc"}"#).unwrap();
        assert_eq!(event.account_id(), "sales");
        assert_eq!(
            event,
            SidecarEvent::Qr { account_id: "sales".to_string(), qr: "2@abc".to_string() }
        );
    }
}
