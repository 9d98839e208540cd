//! Test doubles for the transport's injectable seams.

use gitsync_transport::{
    AgentIdentity, AgentProbe, CredentialKind, KeyProbe, ProgressSink, Secret, SecretProvider,
    SecretRequest, SessionEvent,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;

/// Secret provider answering from a script and recording every request.
#[derive(Debug)]
pub struct ScriptedSecrets {
    answers: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<SecretRequest>>,
    interactive: bool,
}

impl Default for ScriptedSecrets {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSecrets {
    /// A provider with no answers queued; it refuses once the script runs out.
    #[must_use]
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            interactive: true,
        }
    }

    /// Queue an answer.
    #[must_use]
    pub fn answer(self, value: impl Into<String>) -> Self {
        self.answers.lock().push_back(Some(value.into()));
        self
    }

    /// Queue a refusal.
    #[must_use]
    pub fn refuse(self) -> Self {
        self.answers.lock().push_back(None);
        self
    }

    /// Report the provider as non-interactive.
    #[must_use]
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<SecretRequest> {
        self.requests.lock().clone()
    }
}

impl SecretProvider for ScriptedSecrets {
    fn ask(&self, request: &SecretRequest) -> Option<Secret> {
        self.requests.lock().push(request.clone());
        self.answers.lock().pop_front().flatten().map(Secret::new)
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Notice messages.
    pub fn notices(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Notice(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Warning messages.
    pub fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Warning { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Credential kinds offered, in order.
    pub fn offers(&self) -> Vec<CredentialKind> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Offer { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// Drop recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ProgressSink for RecordingSink {
    fn on_event(&self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}

/// ssh-agent stand-in holding a fixed identity list.
#[derive(Debug, Clone, Default)]
pub struct FakeAgent(Vec<AgentIdentity>);

impl FakeAgent {
    /// Agent without identities.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Agent holding one identity per comment.
    #[must_use]
    pub fn with_comments(comments: &[&str]) -> Self {
        Self(
            comments
                .iter()
                .map(|comment| AgentIdentity::from_blob(*comment, comment.as_bytes()))
                .collect(),
        )
    }
}

impl AgentProbe for FakeAgent {
    fn list_identities(&self) -> Vec<AgentIdentity> {
        self.0.clone()
    }
}

/// Key probe that never finds a default key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeys;

impl KeyProbe for NoKeys {
    fn default_key_pair(&self) -> Option<(PathBuf, Option<PathBuf>)> {
        None
    }
}

/// Key probe that always finds the same key pair.
#[derive(Debug, Clone)]
pub struct FixedKey {
    /// Private key path.
    pub private: PathBuf,
    /// Public key path.
    pub public: Option<PathBuf>,
}

impl KeyProbe for FixedKey {
    fn default_key_pair(&self) -> Option<(PathBuf, Option<PathBuf>)> {
        Some((self.private.clone(), self.public.clone()))
    }
}
