//! Per-exchange protocol sessions
//!
//! Every HTTP exchange gets its own [`Session`]: created empty, connected to the
//! shared [`McpServer`], used for exactly one dispatch, then closed. States only
//! move forward (`Created -> Connected -> Handling -> Closed`) and the close
//! hook fires exactly once, including when the session is dropped mid-flight.

use std::{fmt, sync::Arc, time::Duration};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::mcp::rpc::app_error_to_json_rpc;
use crate::mcp::server::{handle_json_rpc_value, McpServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Connected,
    Handling,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Connected => "connected",
            Self::Handling => "handling",
            Self::Closed => "closed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The response was produced and handed back to the HTTP layer.
    Completed,
    TimedOut,
    /// Dropped without an explicit close: client disconnect or panic.
    Aborted,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Aborted => "aborted",
        })
    }
}

/// Hooks fired when sessions open and close.
pub trait SessionObserver: Send + Sync {
    fn on_open(&self, _session_id: Uuid) {}

    fn on_close(&self, session_id: Uuid, reason: CloseReason);
}

#[derive(Debug, Default)]
pub struct TracingSessionObserver;

impl SessionObserver for TracingSessionObserver {
    fn on_open(&self, session_id: Uuid) {
        debug!(session_id = %session_id, "session opened");
    }

    fn on_close(&self, session_id: Uuid, reason: CloseReason) {
        debug!(session_id = %session_id, reason = %reason, "session closed");
    }
}

pub struct Session<'a> {
    id: Uuid,
    state: SessionState,
    server: Option<&'a McpServer>,
    observer: Arc<dyn SessionObserver>,
    timeout: Option<Duration>,
}

impl<'a> Session<'a> {
    pub fn new(observer: Arc<dyn SessionObserver>, timeout: Option<Duration>) -> Self {
        let id = Uuid::new_v4();
        observer.on_open(id);

        Self {
            id,
            state: SessionState::Created,
            server: None,
            observer,
            timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connect(&mut self, server: &'a McpServer) -> Result<(), AppError> {
        if self.state != SessionState::Created {
            return Err(AppError::transport(format!(
                "cannot connect a session that is {}",
                self.state
            )));
        }

        self.server = Some(server);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Runs the single dispatch this session exists for. Returns `Ok(None)`
    /// when the message was a notification.
    pub async fn handle(&mut self, body: &[u8]) -> Result<Option<Value>, AppError> {
        let server = match (self.state, self.server) {
            (SessionState::Connected, Some(server)) => server,
            (state, _) => {
                return Err(AppError::transport(format!(
                    "cannot handle a request while the session is {state}"
                )))
            }
        };
        self.state = SessionState::Handling;

        let payload: Value = serde_json::from_slice(body)
            .map_err(|err| AppError::transport(format!("malformed JSON body: {err}")))?;
        let request_id = payload.get("id").cloned();
        let dispatch = handle_json_rpc_value(server, payload);

        let Some(limit) = self.timeout else {
            return Ok(dispatch.await);
        };

        match tokio::time::timeout(limit, dispatch).await {
            Ok(response) => Ok(response),
            Err(_) => {
                warn!(
                    session_id = %self.id,
                    timeout_ms = limit.as_millis() as u64,
                    "session timed out while handling"
                );
                self.close(CloseReason::TimedOut);
                Ok(request_id.map(|id| app_error_to_json_rpc(Some(id), AppError::timeout(limit))))
            }
        }
    }

    /// Releases the server binding. Returns `false` if the session was already closed.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }

        self.state = SessionState::Closed;
        self.server = None;
        self.observer.on_close(self.id, reason);
        true
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.close(CloseReason::Aborted);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::mcp::registry::{typed_handler, ToolDescriptor, ToolError};

    #[derive(Default)]
    pub(crate) struct CountingObserver {
        pub opened: AtomicUsize,
        pub closed: Mutex<Vec<CloseReason>>,
    }

    impl CountingObserver {
        pub fn close_reasons(&self) -> Vec<CloseReason> {
            self.closed.lock().expect("observer lock").clone()
        }
    }

    impl SessionObserver for CountingObserver {
        fn on_open(&self, _session_id: Uuid) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }

        fn on_close(&self, _session_id: Uuid, reason: CloseReason) {
            self.closed.lock().expect("observer lock").push(reason);
        }
    }

    fn server() -> McpServer {
        let mut server = McpServer::new("session-test", "0.0.1");
        server.register_tool(
            ToolDescriptor::new("stall", "Stall", "Never finishes"),
            typed_handler(|_: serde_json::Value| async move {
                std::future::pending::<Result<serde_json::Value, ToolError>>().await
            }),
        );
        server
    }

    #[tokio::test]
    async fn walks_states_forward_and_closes_once() {
        let server = server();
        let observer = Arc::new(CountingObserver::default());
        let mut session = Session::new(observer.clone(), None);
        assert_eq!(session.state(), SessionState::Created);

        session.connect(&server).expect("connect");
        assert_eq!(session.state(), SessionState::Connected);

        let response = session
            .handle(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .await
            .expect("handled")
            .expect("response for request");
        assert_eq!(response["id"], 1);
        assert_eq!(session.state(), SessionState::Handling);

        assert!(session.close(CloseReason::Completed));
        assert!(!session.close(CloseReason::Completed));
        drop(session);

        assert_eq!(observer.opened.load(Ordering::SeqCst), 1);
        assert_eq!(observer.close_reasons(), vec![CloseReason::Completed]);
    }

    #[tokio::test]
    async fn cannot_move_backwards() {
        let server = server();
        let mut session = Session::new(Arc::new(CountingObserver::default()), None);

        assert!(session.handle(b"{}").await.is_err());
        session.connect(&server).expect("connect");
        assert!(session.connect(&server).is_err());

        let _ = session
            .handle(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .await
            .expect("first dispatch");
        let second = session
            .handle(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
            .await;
        assert!(matches!(second, Err(AppError::Transport { .. })));

        session.close(CloseReason::Completed);
        assert!(session.connect(&server).is_err());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn malformed_json_is_transport_error() {
        let server = server();
        let mut session = Session::new(Arc::new(CountingObserver::default()), None);
        session.connect(&server).expect("connect");

        let error = session.handle(b"{").await.expect_err("malformed body");
        assert!(matches!(error, AppError::Transport { .. }));
    }

    #[tokio::test]
    async fn batch_is_rejected_as_single_invalid_request() {
        let server = server();
        let mut session = Session::new(Arc::new(CountingObserver::default()), None);
        session.connect(&server).expect("connect");

        let response = session
            .handle(br#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#)
            .await
            .expect("handled")
            .expect("error response");
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn drop_without_close_aborts_once() {
        let server = server();
        let observer = Arc::new(CountingObserver::default());
        {
            let mut session = Session::new(observer.clone(), None);
            session.connect(&server).expect("connect");
        }

        assert_eq!(observer.close_reasons(), vec![CloseReason::Aborted]);
    }

    #[tokio::test]
    async fn timeout_closes_session_with_timeout_error() {
        let server = server();
        let observer = Arc::new(CountingObserver::default());
        let mut session = Session::new(observer.clone(), Some(Duration::from_millis(20)));
        session.connect(&server).expect("connect");

        let body = json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "stall", "arguments": {}}
        })
        .to_string();
        let response = session
            .handle(body.as_bytes())
            .await
            .expect("handled")
            .expect("timeout response");

        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], -32001);
        assert_eq!(response["error"]["data"]["code"], "timeout");
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.close(CloseReason::Completed));
        drop(session);

        assert_eq!(observer.close_reasons(), vec![CloseReason::TimedOut]);
    }
}
