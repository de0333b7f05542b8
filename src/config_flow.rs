//! Config-entry creation flow.
//!
//! A minimal data-entry wizard for creating an integration's persisted
//! configuration entry. Flows start from one of two sources: imported
//! configuration finishes immediately with the imported payload, while a
//! user-initiated flow first presents a confirmation form. Only a single
//! entry may exist per manager; while one does, every new flow aborts with
//! [`AbortReason::SingleInstanceAllowed`] no matter how it was started.

use std::collections::HashSet;

use anyhow::{anyhow, Error};
use serde_json::{Map, Value};

/// Step id of the confirmation form shown to user-initiated flows.
pub const STEP_USER: &str = "user";

/// A persisted configuration entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    /// The integration the entry belongs to.
    pub domain: String,
    /// The payload the flow stored.
    pub data: Map<String, Value>,
}

/// How a flow was started.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum FlowSource {
    /// Started by the user; shows the confirmation form first.
    User,
    /// Started from imported configuration; creates the entry directly.
    Import,
}

/// Machine-readable reasons a flow ends without creating an entry.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AbortReason {
    /// An entry already exists, and only one is allowed.
    SingleInstanceAllowed,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::SingleInstanceAllowed => "single_instance_allowed",
        }
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of driving a flow one step forward.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// The flow wants input; resume it with [`FlowManager::configure`].
    Form { flow_id: u64, step_id: &'static str },
    /// The flow finished and stored `entry`.
    CreateEntry { entry: ConfigEntry },
    /// The flow ended without creating an entry.
    Abort { reason: AbortReason },
}

/// Creates and stores config entries for one integration, enforcing the
/// single-instance rule.
#[derive(Debug)]
pub struct FlowManager {
    domain: String,
    entries: Vec<ConfigEntry>,
    pending: HashSet<u64>,
    next_flow_id: u64,
}

impl FlowManager {
    pub fn new(domain: impl Into<String>) -> Self {
        FlowManager {
            domain: domain.into(),
            entries: Vec::new(),
            pending: HashSet::new(),
            next_flow_id: 0,
        }
    }

    /// The entries currently stored.
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    /// Store an entry directly, bypassing the wizard.
    ///
    /// Used to restore previously persisted entries at startup; entries added
    /// this way trip the duplicate guard exactly like wizard-created ones.
    pub fn add_entry(&mut self, data: Map<String, Value>) {
        let domain = self.domain.clone();
        self.entries.push(ConfigEntry { domain, data });
    }

    /// Start a new flow from `source`.
    ///
    /// Import flows carry their payload in `data` and finish immediately;
    /// user flows ignore `data` and get a [`FlowResult::Form`] to answer.
    pub fn init(&mut self, source: FlowSource, data: Option<Map<String, Value>>) -> FlowResult {
        if !self.entries.is_empty() {
            tracing::debug!(domain = %self.domain, ?source, "aborting flow, an entry already exists");
            return FlowResult::Abort {
                reason: AbortReason::SingleInstanceAllowed,
            };
        }

        match source {
            FlowSource::Import => self.create_entry(data.unwrap_or_default()),
            FlowSource::User => {
                let flow_id = self.next_flow_id;
                self.next_flow_id += 1;
                self.pending.insert(flow_id);
                FlowResult::Form {
                    flow_id,
                    step_id: STEP_USER,
                }
            }
        }
    }

    /// Submit form input for a pending flow.
    ///
    /// Fails if `flow_id` does not name a pending flow. An empty payload is
    /// valid input: the entry is created with empty data.
    pub fn configure(&mut self, flow_id: u64, data: Map<String, Value>) -> Result<FlowResult, Error> {
        if !self.pending.remove(&flow_id) {
            return Err(anyhow!("no pending flow {}", flow_id));
        }

        // An entry may have appeared while the form was open.
        if !self.entries.is_empty() {
            return Ok(FlowResult::Abort {
                reason: AbortReason::SingleInstanceAllowed,
            });
        }

        Ok(self.create_entry(data))
    }

    fn create_entry(&mut self, data: Map<String, Value>) -> FlowResult {
        let entry = ConfigEntry {
            domain: self.domain.clone(),
            data,
        };
        self.entries.push(entry.clone());
        tracing::debug!(domain = %self.domain, "created config entry");

        FlowResult::CreateEntry { entry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    const DOMAIN: &str = "flick_pricing";

    fn payload(name: &str) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("name".to_owned(), json!(name));
        data
    }

    #[test]
    fn import_creates_entry_with_payload() {
        let mut flows = FlowManager::new(DOMAIN);

        let result = flows.init(FlowSource::Import, Some(payload("X")));

        match result {
            FlowResult::CreateEntry { entry } => {
                assert_eq!(entry.domain, DOMAIN);
                assert_eq!(entry.data, payload("X"));
            }
            other => panic!("expected entry creation, got {:?}", other),
        }
        assert_eq!(flows.entries().len(), 1);
    }

    #[test]
    fn user_flow_confirms_then_creates_empty_entry() {
        let mut flows = FlowManager::new(DOMAIN);

        let flow_id = match flows.init(FlowSource::User, None) {
            FlowResult::Form { flow_id, step_id } => {
                assert_eq!(step_id, STEP_USER);
                flow_id
            }
            other => panic!("expected a form, got {:?}", other),
        };

        let result = flows.configure(flow_id, Map::new()).unwrap();

        match result {
            FlowResult::CreateEntry { entry } => assert!(entry.data.is_empty()),
            other => panic!("expected entry creation, got {:?}", other),
        }
        assert_eq!(flows.entries().len(), 1);
    }

    #[test]
    fn second_flow_aborts_when_entry_exists() {
        let mut flows = FlowManager::new(DOMAIN);
        flows.add_entry(Map::new());

        for result in vec![
            flows.init(FlowSource::User, Some(Map::new())),
            flows.init(FlowSource::Import, Some(payload("X"))),
        ] {
            match result {
                FlowResult::Abort { reason } => {
                    assert_eq!(reason, AbortReason::SingleInstanceAllowed);
                    assert_eq!(reason.to_string(), "single_instance_allowed");
                }
                other => panic!("expected an abort, got {:?}", other),
            }
        }
        assert_eq!(flows.entries().len(), 1);
    }

    #[test]
    fn entry_created_while_form_open_aborts_the_flow() {
        let mut flows = FlowManager::new(DOMAIN);

        let flow_id = match flows.init(FlowSource::User, None) {
            FlowResult::Form { flow_id, .. } => flow_id,
            other => panic!("expected a form, got {:?}", other),
        };
        flows.add_entry(payload("existing"));

        let result = flows.configure(flow_id, Map::new()).unwrap();

        assert_eq!(
            result,
            FlowResult::Abort {
                reason: AbortReason::SingleInstanceAllowed
            }
        );
        assert_eq!(flows.entries().len(), 1);
    }

    #[test]
    fn configure_unknown_flow_is_an_error() {
        let mut flows = FlowManager::new(DOMAIN);

        assert!(flows.configure(42, Map::new()).is_err());

        // A completed flow cannot be configured twice.
        let flow_id = match flows.init(FlowSource::User, None) {
            FlowResult::Form { flow_id, .. } => flow_id,
            other => panic!("expected a form, got {:?}", other),
        };
        flows.configure(flow_id, Map::new()).unwrap();
        assert!(flows.configure(flow_id, Map::new()).is_err());
    }
}
