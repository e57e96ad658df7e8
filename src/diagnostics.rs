//! Diagnostic log and the channel that feeds it.
//!
//! Command sessions run on background tasks and emit diagnostics through an
//! [`EventSender`]. A single [`LogPump`] task drains the bounded channel and is
//! the only writer of the [`DiagnosticLog`], so concurrent commands never
//! corrupt each other's lines. Events from one sender arrive in the order they
//! were sent.

use crate::error::Result;
use crate::model::{DiagnosticEvent, Severity};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

enum LogMessage {
    Event(DiagnosticEvent),
    Flush(oneshot::Sender<()>),
}

/// Append-only, process-wide record of everything the command host reported.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: RwLock<Vec<DiagnosticEvent>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, event: DiagnosticEvent) {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    #[cfg(test)]
    pub fn entries(&self) -> Vec<DiagnosticEvent> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// The full accumulated text, one rendered line per event.
    pub fn text(&self) -> String {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut text = String::new();
        for event in entries.iter() {
            text.push_str(&event.render());
            text.push('\n');
        }
        text
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.text())?;
        Ok(())
    }
}

/// Cloneable handle used by sessions and operations to report diagnostics.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LogMessage>,
}

impl EventSender {
    pub async fn emit(&self, severity: Severity, message: impl Into<String>) {
        self.send(DiagnosticEvent::now(severity, message)).await;
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.emit(Severity::Info, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.emit(Severity::Error, message).await;
    }

    pub async fn send(&self, event: DiagnosticEvent) {
        if self.tx.send(LogMessage::Event(event)).await.is_err() {
            debug!("diagnostic log closed, dropping event");
        }
    }

    /// Waits until every event sent before this call has been appended.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(LogMessage::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

pub type LogObserver = Box<dyn Fn(&DiagnosticEvent) + Send + Sync>;

/// Single writer that moves events from the channel into the log.
pub struct LogPump {
    rx: mpsc::Receiver<LogMessage>,
    log: Arc<DiagnosticLog>,
    observer: Option<LogObserver>,
}

/// Creates a bounded diagnostic channel writing into `log`.
pub fn channel(capacity: usize, log: Arc<DiagnosticLog>) -> (EventSender, LogPump) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSender { tx },
        LogPump {
            rx,
            log,
            observer: None,
        },
    )
}

impl LogPump {
    /// Calls `observer` for each event just before it is appended.
    pub fn with_observer(mut self, observer: LogObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Runs until every [`EventSender`] has been dropped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                LogMessage::Event(event) => {
                    if let Some(observer) = &self.observer {
                        observer(&event);
                    }
                    self.log.append(event);
                }
                LogMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }
}
