use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field name to typed value mapping carried by a contract.
pub type Payload = Map<String, Value>;

/// Fully qualified template identifier as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateId {
    pub package_id: String,
    pub module_name: String,
    pub entity_name: String,
}

impl TemplateId {
    pub fn new(
        package_id: impl Into<String>,
        module_name: impl Into<String>,
        entity_name: impl Into<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            module_name: module_name.into(),
            entity_name: entity_name.into(),
        }
    }

    /// Package ids change with every model upload, so only module and entity are compared.
    pub fn matches(&self, module_name: &str, entity_name: &str) -> bool {
        self.module_name == module_name && self.entity_name == entity_name
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.package_id, self.module_name, self.entity_name
        )
    }
}

/// A contract was created.
///
/// Only created events carry a payload, so they are the only ones the dispatcher decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    /// Ledger-wide unique id of this event.
    pub event_id: String,
    pub contract_id: String,
    pub template_id: TemplateId,
    /// Parties allowed to see the event. Subscriptions only deliver events their party witnesses.
    #[serde(default)]
    pub witness_parties: Vec<String>,
    /// Contract arguments, decoded according to `template_id`.
    pub arguments: Payload,
}

/// A contract was archived. Carries no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedEvent {
    pub event_id: String,
    pub contract_id: String,
    pub template_id: TemplateId,
    #[serde(default)]
    pub witness_parties: Vec<String>,
}

/// A single fact observed on the ledger, as delivered inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContractEvent {
    Created(CreatedEvent),
    Archived(ArchivedEvent),
}

impl ContractEvent {
    pub fn event_id(&self) -> &str {
        match self {
            ContractEvent::Created(e) => &e.event_id,
            ContractEvent::Archived(e) => &e.event_id,
        }
    }

    pub fn template_id(&self) -> &TemplateId {
        match self {
            ContractEvent::Created(e) => &e.template_id,
            ContractEvent::Archived(e) => &e.template_id,
        }
    }

    /// Whether `party` is among the event's witnesses.
    pub fn is_visible_to(&self, party: &str) -> bool {
        let witnesses = match self {
            ContractEvent::Created(e) => &e.witness_parties,
            ContractEvent::Archived(e) => &e.witness_parties,
        };
        witnesses.iter().any(|w| w == party)
    }
}

/// An atomic ledger commit, as delivered by a subscription.
///
/// Events keep the ledger's order. The offset is opaque and only ever compared for equality,
/// or handed back to the ledger to resume after this transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: String,
    /// Position of the transaction in the party's stream.
    pub offset: String,
    pub effective_at: DateTime<Utc>,
    pub events: Vec<ContractEvent>,
}

/// Where a subscription starts reading the ledger history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerOffset {
    /// Replay the whole history.
    Begin,
    /// Resume after the transaction with this offset.
    Absolute(String),
}
