use super::event::{Payload, TemplateId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Window during which the ledger rejects a resubmission of the same command id.
pub const DEDUPLICATION_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Create {
        template_id: TemplateId,
        arguments: Payload,
    },
    #[serde(rename_all = "camelCase")]
    Exercise {
        template_id: TemplateId,
        contract_id: String,
        choice: String,
        argument: Value,
    },
}

/// A command bound to the submitting party and a deduplication id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub command_id: String,
    pub party: String,
    pub deduplication_seconds: u64,
    pub command: Command,
}

impl SubmitRequest {
    pub fn new(command_id: impl Into<String>, party: impl Into<String>, command: Command) -> Self {
        Self {
            command_id: command_id.into(),
            party: party.into(),
            deduplication_seconds: DEDUPLICATION_WINDOW.as_secs(),
            command,
        }
    }
}
