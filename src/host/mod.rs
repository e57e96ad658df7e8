use crate::diagnostics::EventSender;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod executor;
pub mod protocol;
pub mod pwsh;
pub mod scripts;

pub use executor::CommandExecutor;
pub use pwsh::PwshHost;

/// A dynamically shaped object emitted by a script, with fields looked up by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredRecord {
    fields: Map<String, Value>,
}

impl StructuredRecord {
    /// Returns the field, treating an explicit `null` the same as an absent one.
    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Value> for StructuredRecord {
    /// Scalars and arrays carry no named fields and become empty records.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

/// Starts isolated execution sessions.
#[async_trait]
pub trait CommandHost: Send + Sync {
    /// Opens a session whose diagnostics are forwarded to `events`.
    async fn open_session(&self, events: EventSender) -> Result<Box<dyn HostSession>>;
}

/// One execution session. `&mut self` keeps it to a single command at a time.
#[async_trait]
pub trait HostSession: Send {
    async fn invoke(&mut self, script: &str) -> Result<Vec<StructuredRecord>>;

    async fn close(self: Box<Self>);
}
