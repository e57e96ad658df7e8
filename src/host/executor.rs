use crate::diagnostics::EventSender;
use crate::error::{ModManError, Result};
use crate::host::{CommandHost, StructuredRecord};
use std::sync::Arc;
use tracing::debug;

/// Runs scripts in fresh, provisioned host sessions on background tasks.
#[derive(Clone)]
pub struct CommandExecutor {
    host: Arc<dyn CommandHost>,
    events: EventSender,
    provision: Option<Arc<str>>,
}

impl CommandExecutor {
    pub fn new(host: Arc<dyn CommandHost>, events: EventSender) -> Self {
        Self {
            host,
            events,
            provision: None,
        }
    }

    /// Runs `script` in every new session before the requested command.
    pub fn with_provisioning(mut self, script: impl Into<String>) -> Self {
        self.provision = Some(Arc::from(script.into()));
        self
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Executes `script` and returns the records it emitted.
    ///
    /// Diagnostics are streamed to the log while the command runs. Any host
    /// fault ends the call with a single error; nothing is retried.
    pub async fn execute(&self, script: impl Into<String>) -> Result<Vec<StructuredRecord>> {
        let host = self.host.clone();
        let events = self.events.clone();
        let provision = self.provision.clone();
        let script = script.into();

        tokio::spawn(async move {
            run_in_session(host.as_ref(), &events, provision.as_deref(), &script).await
        })
        .await
        .map_err(|e| ModManError::Execution(format!("Command task failed: {e}")))?
    }
}

async fn run_in_session(
    host: &dyn CommandHost,
    events: &EventSender,
    provision: Option<&str>,
    script: &str,
) -> Result<Vec<StructuredRecord>> {
    events.info("Opening session...").await;
    let mut session = host.open_session(events.clone()).await?;

    if let Some(provision) = provision {
        events.info("Provisioning session...").await;
        if let Err(err) = session.invoke(provision).await {
            session.close().await;
            return Err(err);
        }
        events.info("Setup complete.").await;
    }

    debug!("Submitting command");
    let result = session.invoke(script).await;
    session.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{self, DiagnosticLog};
    use crate::model::Severity;
    use crate::testing::{FakeHost, FakeReply};
    use serde_json::json;

    #[tokio::test]
    async fn provisions_before_running_the_command() {
        let host = Arc::new(FakeHost::new());
        host.on("Get-Thing", FakeReply::records(vec![json!({"Name": "Az"})]));
        let log = Arc::new(DiagnosticLog::new());
        let (events, pump) = diagnostics::channel(8, log.clone());
        pump.spawn();

        let executor = CommandExecutor::new(host.clone(), events.clone())
            .with_provisioning("Import-Module Setup");
        let records = executor.execute("Get-Thing").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(host.scripts(), vec!["Import-Module Setup", "Get-Thing"]);
        assert_eq!(host.sessions_opened(), 1);
        assert_eq!(host.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn failed_provisioning_skips_the_command() {
        let host = Arc::new(FakeHost::new());
        host.on("Setup", FakeReply::fault("PSResourceGet could not be installed"));
        let log = Arc::new(DiagnosticLog::new());
        let (events, pump) = diagnostics::channel(8, log.clone());
        pump.spawn();

        let executor = CommandExecutor::new(host.clone(), events.clone())
            .with_provisioning("Import-Module Setup");
        let err = executor.execute("Get-Thing").await.unwrap_err();

        assert!(matches!(err, ModManError::Execution(_)));
        assert_eq!(host.scripts(), vec!["Import-Module Setup"]);
        assert_eq!(host.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn diagnostics_emitted_before_a_fault_stay_in_the_log() {
        let host = Arc::new(FakeHost::new());
        host.on(
            "Get-Thing",
            FakeReply::fault("network unreachable")
                .with_diagnostic(Severity::Verbose, "Contacting gallery")
                .with_diagnostic(Severity::Warning, "Retrying later is up to you"),
        );
        let log = Arc::new(DiagnosticLog::new());
        let (events, pump) = diagnostics::channel(8, log.clone());
        pump.spawn();

        let executor = CommandExecutor::new(host, events.clone());
        assert!(executor.execute("Get-Thing").await.is_err());
        events.flush().await;

        let streamed: Vec<_> = log
            .entries()
            .into_iter()
            .filter(|e| e.severity != Severity::Info)
            .map(|e| e.message)
            .collect();
        assert_eq!(streamed, vec!["Contacting gallery", "Retrying later is up to you"]);
    }
}
