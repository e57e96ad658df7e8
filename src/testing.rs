//! In-process stand-ins for the command host, notifier and location opener.

use crate::diagnostics::EventSender;
use crate::error::{ModManError, Result};
use crate::host::{CommandHost, HostSession, StructuredRecord};
use crate::model::Severity;
use crate::notify::Notifier;
use crate::agents::location_opener::LocationOpener;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct FakeReply {
    diagnostics: Vec<(Severity, String)>,
    outcome: std::result::Result<Vec<Value>, String>,
}

impl FakeReply {
    pub fn records(records: Vec<Value>) -> Self {
        Self {
            diagnostics: Vec::new(),
            outcome: Ok(records),
        }
    }

    pub fn fault(message: &str) -> Self {
        Self {
            diagnostics: Vec::new(),
            outcome: Err(message.to_string()),
        }
    }

    pub fn with_diagnostic(mut self, severity: Severity, message: &str) -> Self {
        self.diagnostics.push((severity, message.to_string()));
        self
    }
}

type Probe = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct FakeState {
    rules: Vec<(String, VecDeque<FakeReply>)>,
    scripts: Vec<String>,
    opened: usize,
    closed: usize,
}

/// Replies to scripts by substring. Repeated rules for the same key are
/// served in order; the last one keeps answering.
#[derive(Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeState>>,
    probe: Arc<Mutex<Option<Probe>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, key: &str, reply: FakeReply) {
        let mut state = self.state.lock().unwrap();
        match state.rules.iter_mut().find(|(k, _)| k == key) {
            Some((_, replies)) => replies.push_back(reply),
            None => state.rules.push((key.to_string(), VecDeque::from([reply]))),
        }
    }

    /// Called with each script as it is submitted.
    pub fn set_probe(&self, probe: impl Fn(&str) + Send + Sync + 'static) {
        *self.probe.lock().unwrap() = Some(Box::new(probe));
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub fn scripts_containing(&self, needle: &str) -> Vec<String> {
        self.scripts()
            .into_iter()
            .filter(|s| s.contains(needle))
            .collect()
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl CommandHost for FakeHost {
    async fn open_session(&self, events: EventSender) -> Result<Box<dyn HostSession>> {
        self.state.lock().unwrap().opened += 1;
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            probe: self.probe.clone(),
            events,
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    probe: Arc<Mutex<Option<Probe>>>,
    events: EventSender,
}

#[async_trait]
impl HostSession for FakeSession {
    async fn invoke(&mut self, script: &str) -> Result<Vec<StructuredRecord>> {
        if let Some(probe) = self.probe.lock().unwrap().as_ref() {
            probe(script);
        }

        let reply = {
            let mut state = self.state.lock().unwrap();
            state.scripts.push(script.to_string());
            state
                .rules
                .iter_mut()
                .find(|(key, _)| script.contains(key.as_str()))
                .and_then(|(_, replies)| {
                    if replies.len() > 1 {
                        replies.pop_front()
                    } else {
                        replies.front().cloned()
                    }
                })
                .unwrap_or_else(|| FakeReply::records(Vec::new()))
        };

        for (severity, message) in reply.diagnostics {
            self.events.emit(severity, message).await;
        }
        match reply.outcome {
            Ok(records) => Ok(records.into_iter().map(StructuredRecord::from).collect()),
            Err(message) => Err(ModManError::Execution(message)),
        }
    }

    async fn close(self: Box<Self>) {
        self.state.lock().unwrap().closed += 1;
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<(String, String)>>,
    notices: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<(String, String)> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, title: &str, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn notice(&self, title: &str, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingOpener {
    pub fn failing() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

impl LocationOpener for RecordingOpener {
    fn open(&self, location: &Path) -> Result<()> {
        if self.fail {
            return Err(ModManError::Execution("no file browser available".into()));
        }
        self.opened.lock().unwrap().push(location.to_path_buf());
        Ok(())
    }
}
