use crate::config::HostSettings;
use crate::diagnostics::EventSender;
use crate::error::{ModManError, Result};
use crate::host::protocol::{HostLine, SESSION_LOOP, encode_request};
use crate::host::{CommandHost, HostSession, StructuredRecord};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long a closing session may take to exit before it is killed.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Command host backed by a long-lived `pwsh` process per session.
pub struct PwshHost {
    program: String,
    args: Vec<String>,
}

impl PwshHost {
    pub fn new(settings: &HostSettings) -> Self {
        let mut args = settings.args.clone();
        if let Some(policy) = &settings.execution_policy {
            args.push("-ExecutionPolicy".to_string());
            args.push(policy.clone());
        }
        Self {
            program: settings.program.clone(),
            args,
        }
    }

    /// `-EncodedCommand` takes base64 over UTF-16LE, which sidesteps argument quoting.
    fn encoded_session_loop() -> String {
        let utf16: Vec<u8> = SESSION_LOOP
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        STANDARD.encode(utf16)
    }
}

#[async_trait]
impl CommandHost for PwshHost {
    async fn open_session(&self, events: EventSender) -> Result<Box<dyn HostSession>> {
        debug!(program = %self.program, "Starting command host session");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("-EncodedCommand")
            .arg(Self::encoded_session_loop())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| ModManError::HostUnavailable {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ModManError::Protocol("Host stdin was not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ModManError::Protocol("Host stdout was not captured".into()))?;

        // Anything the host prints to stderr is out of band; surface it as errors.
        let stderr_task = child.stderr.take().map(|stderr| {
            let events = events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        events.error(line).await;
                    }
                }
            })
        });

        Ok(Box::new(PwshSession {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            events,
            stderr_task,
        }))
    }
}

struct PwshSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    events: EventSender,
    stderr_task: Option<JoinHandle<()>>,
}

impl PwshSession {
    async fn exit_error(&mut self) -> ModManError {
        match self.child.wait().await {
            Ok(status) => ModManError::HostExited {
                code: status.code().unwrap_or(-1),
            },
            Err(e) => ModManError::Io(e),
        }
    }
}

#[async_trait]
impl HostSession for PwshSession {
    async fn invoke(&mut self, script: &str) -> Result<Vec<StructuredRecord>> {
        let request = encode_request(script)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ModManError::Protocol("Session is already closed".into()))?;

        if stdin.write_all(request.as_bytes()).await.is_err() || stdin.flush().await.is_err() {
            return Err(self.exit_error().await);
        }

        let mut records = Vec::new();
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(self.exit_error().await);
            };
            if line.trim().is_empty() {
                continue;
            }

            match HostLine::parse(&line) {
                Ok(HostLine::Record(value)) => records.push(StructuredRecord::from(value)),
                Ok(HostLine::Diagnostic(severity, message)) => {
                    self.events.emit(severity, message).await;
                }
                Ok(HostLine::Done) => {
                    debug!(records = records.len(), "Command completed");
                    return Ok(records);
                }
                Ok(HostLine::Fault(message)) => return Err(ModManError::Execution(message)),
                Err(err) => {
                    warn!("Unrecognised host output: {err}");
                    self.events.info(line).await;
                }
            }
        }
    }

    async fn close(mut self: Box<Self>) {
        // Closing stdin ends the session loop.
        drop(self.stdin.take());

        match tokio::time::timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Command host session closed"),
            Ok(Err(e)) => warn!("Failed to wait for command host: {e}"),
            Err(_) => {
                warn!("Command host did not exit in time, killing it");
                if let Err(e) = self.child.kill().await {
                    warn!("Failed to kill command host: {e}");
                }
            }
        }

        if let Some(task) = self.stderr_task.take() {
            if tokio::time::timeout(CLOSE_GRACE, task).await.is_err() {
                warn!("Command host stderr did not close");
            }
        }
    }
}
