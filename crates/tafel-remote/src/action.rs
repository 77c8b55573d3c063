//! Remote action envelopes and the action-name set.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

/// Response callback, invoked at most once when the correlated response
/// arrives. A lost connection leaves it permanently pending.
pub type ResponseCallback = Box<dyn FnOnce(&Value) + Send>;

/// The set of logical action names understood by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RemoteActionKind {
    GetEvents,
    Subscribe,
    Unsubscribe,
    Submission,
    TestResult,
    GetTestResults,
    /// Escape hatch for server extensions.
    Custom(SmolStr),
}

impl RemoteActionKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::GetEvents => "get-events",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Submission => "submission",
            Self::TestResult => "testresult",
            Self::GetTestResults => "get-testresults",
            Self::Custom(name) => name.as_str(),
        }
    }

    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "get-events" => Self::GetEvents,
            "subscribe" => Self::Subscribe,
            "unsubscribe" => Self::Unsubscribe,
            "submission" => Self::Submission,
            "testresult" => Self::TestResult,
            "get-testresults" => Self::GetTestResults,
            other => Self::Custom(SmolStr::new(other)),
        }
    }
}

/// Session context merged into every outbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ActionContext {
    #[serde(default)]
    pub embed_id: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_name: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_document: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_user: Option<SmolStr>,
}

impl ActionContext {
    /// Context naming only the embed.
    #[must_use]
    pub fn for_embed(embed_id: impl Into<SmolStr>) -> Self {
        Self {
            embed_id: embed_id.into(),
            ..Self::default()
        }
    }
}

/// Request envelope for one logical server action.
pub struct RemoteAction {
    kind: RemoteActionKind,
    payload: Map<String, Value>,
    context: ActionContext,
    callback: Option<ResponseCallback>,
}

impl RemoteAction {
    /// Create an action with an empty context and no callback.
    #[must_use]
    pub fn new(kind: RemoteActionKind, payload: Map<String, Value>) -> Self {
        Self {
            kind,
            payload,
            context: ActionContext::default(),
            callback: None,
        }
    }

    /// Attach the response callback.
    #[must_use]
    pub fn on_response(mut self, callback: impl FnOnce(&Value) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Merge session context into the action before it is sent.
    pub fn set_context(&mut self, context: ActionContext) {
        self.context = context;
    }

    #[must_use]
    pub fn kind(&self) -> &RemoteActionKind {
        &self.kind
    }

    #[must_use]
    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    #[must_use]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub(crate) fn take_callback(&mut self) -> Option<ResponseCallback> {
        self.callback.take()
    }

    pub(crate) fn into_parts(self) -> (RemoteActionKind, Map<String, Value>, ActionContext) {
        (self.kind, self.payload, self.context)
    }
}

impl std::fmt::Debug for RemoteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAction")
            .field("kind", &self.kind)
            .field("context", &self.context)
            .field("expects_response", &self.callback.is_some())
            .finish()
    }
}
