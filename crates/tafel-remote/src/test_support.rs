//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use smol_str::SmolStr;

use crate::error::RemoteError;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Link {
    to_client: VecDeque<String>,
    to_server: VecDeque<String>,
    severed: bool,
}

/// Client half of an in-memory connection.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    link: Arc<Mutex<Link>>,
}

/// Server half of an in-memory connection: inject inbound frames,
/// inspect what the client sent, or sever the link.
#[derive(Debug, Clone)]
pub struct MemoryServer {
    link: Arc<Mutex<Link>>,
}

/// Create a connected transport/server pair.
#[must_use]
pub fn memory_pair() -> (MemoryTransport, MemoryServer) {
    let link = Arc::new(Mutex::new(Link::default()));
    (
        MemoryTransport { link: link.clone() },
        MemoryServer { link },
    )
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: &str) -> Result<(), RemoteError> {
        let mut link = self.link.lock().expect("memory link poisoned");
        if link.severed {
            return Err(RemoteError::NotConnected);
        }
        link.to_server.push_back(frame.to_string());
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<String>, RemoteError> {
        let mut link = self.link.lock().expect("memory link poisoned");
        if let Some(frame) = link.to_client.pop_front() {
            return Ok(Some(frame));
        }
        if link.severed {
            return Err(RemoteError::NotConnected);
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.link.lock().expect("memory link poisoned").severed = true;
    }
}

impl MemoryServer {
    /// Deliver a raw frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        self.link
            .lock()
            .expect("memory link poisoned")
            .to_client
            .push_back(frame.into());
    }

    /// Deliver a response frame for the given request id.
    pub fn respond(&self, id: u64, mut body: Value) {
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), json!(id));
        }
        self.push(body.to_string());
    }

    /// Deliver a push event of the given type.
    pub fn push_event(&self, event: &str, data: Value) {
        self.push(json!({ "event": event, "data": data }).to_string());
    }

    /// Drain every frame the client has sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        let mut link = self.link.lock().expect("memory link poisoned");
        link.to_server.drain(..).collect()
    }

    /// Drain sent frames, parsed as JSON.
    #[must_use]
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Sever the link; subsequent sends and polls fail.
    pub fn sever(&self) {
        self.link.lock().expect("memory link poisoned").severed = true;
    }

    /// Correlation id of the last request the client sent, if any.
    #[must_use]
    pub fn last_request_id(frames: &[Value]) -> Option<u64> {
        frames
            .iter()
            .rev()
            .find_map(|frame| frame.get("id").and_then(Value::as_u64))
    }

    /// Action name of a sent frame.
    #[must_use]
    pub fn action_name(frame: &Value) -> Option<SmolStr> {
        frame
            .get("action")
            .and_then(Value::as_str)
            .map(SmolStr::new)
    }
}
