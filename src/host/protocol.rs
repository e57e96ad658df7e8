//! Line protocol spoken between the tool and a `pwsh` session.
//!
//! Each request is one JSON-encoded script string on stdin. The session
//! answers with stdout lines of the form `<TAG> <json>`:
//!
//! | tag | meaning                          |
//! |-----|----------------------------------|
//! | `O` | output object (a record)         |
//! | `E` | error stream text                |
//! | `W` | warning stream text              |
//! | `V` | verbose (and debug) stream text  |
//! | `I` | information stream text          |
//! | `D` | command finished                 |
//! | `F` | command faulted, payload is text |

use crate::error::{ModManError, Result};
use crate::model::Severity;
use serde_json::Value;

/// Read-eval loop run inside `pwsh`; it emits the tagged lines parsed below.
pub const SESSION_LOOP: &str = r#"
$ErrorActionPreference = 'Continue'
$ProgressPreference = 'SilentlyContinue'
[Console]::InputEncoding = [System.Text.UTF8Encoding]::new($false)
[Console]::OutputEncoding = [System.Text.UTF8Encoding]::new($false)
$HostOut = [Console]::Out
function Send-HostLine([string]$Tag, $Payload) {
    $HostOut.WriteLine($Tag + ' ' + (ConvertTo-Json -InputObject $Payload -Compress -Depth 5))
    $HostOut.Flush()
}
while ($null -ne ($Request = [Console]::In.ReadLine())) {
    try {
        $Command = [scriptblock]::Create((ConvertFrom-Json -InputObject $Request))
        & $Command *>&1 | ForEach-Object {
            if ($_ -is [System.Management.Automation.ErrorRecord]) { Send-HostLine 'E' ([string]$_) }
            elseif ($_ -is [System.Management.Automation.WarningRecord]) { Send-HostLine 'W' $_.Message }
            elseif ($_ -is [System.Management.Automation.VerboseRecord]) { Send-HostLine 'V' $_.Message }
            elseif ($_ -is [System.Management.Automation.DebugRecord]) { Send-HostLine 'V' $_.Message }
            elseif ($_ -is [System.Management.Automation.InformationRecord]) { Send-HostLine 'I' ([string]$_.MessageData) }
            else { Send-HostLine 'O' $_ }
        }
        Send-HostLine 'D' $null
    } catch {
        Send-HostLine 'F' ([string]$_)
    }
}
"#;

#[derive(Debug, Clone, PartialEq)]
pub enum HostLine {
    Record(Value),
    Diagnostic(Severity, String),
    Done,
    Fault(String),
}

impl HostLine {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (tag, payload) = line
            .split_once(' ')
            .ok_or_else(|| ModManError::Protocol(format!("Missing payload in line '{line}'")))?;

        let value: Value = serde_json::from_str(payload).map_err(|e| {
            ModManError::Protocol(format!("Invalid payload for tag '{tag}': {e}"))
        })?;

        match tag {
            "O" => Ok(HostLine::Record(value)),
            "E" => Ok(HostLine::Diagnostic(Severity::Error, into_text(value))),
            "W" => Ok(HostLine::Diagnostic(Severity::Warning, into_text(value))),
            "V" => Ok(HostLine::Diagnostic(Severity::Verbose, into_text(value))),
            "I" => Ok(HostLine::Diagnostic(Severity::Info, into_text(value))),
            "D" => Ok(HostLine::Done),
            "F" => Ok(HostLine::Fault(into_text(value))),
            other => Err(ModManError::Protocol(format!("Unknown tag '{other}'"))),
        }
    }
}

/// Encodes a script as a single request line, newline included.
pub fn encode_request(script: &str) -> Result<String> {
    let mut line = serde_json::to_string(script)?;
    line.push('\n');
    Ok(line)
}

fn into_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
