//! In-memory Action Bridge for tests.
//!
//! [`ScriptedBridge`] behaves like a connector backed by a small record
//! store: the list action returns the stored records, the create action
//! appends one. Tests can queue failures and hold individual calls on a
//! [`Gate`] to control the order in which responses arrive.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use tokio::sync::Notify;

use super::{ActionBridge, BridgeError, PlatformError};

/// A call observed by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub connection: String,
    pub action: String,
    pub input: Option<Value>,
}

/// Holds one bridge call until released.
#[derive(Debug, Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    /// Let the held call complete. Releasing before the call arrives is fine.
    pub fn release(&self) {
        self.0.notify_one();
    }
}

#[derive(Default)]
struct ScriptState {
    records: Vec<Value>,
    next_id: u64,
    calls: Vec<RecordedCall>,
    list_failures: VecDeque<BridgeError>,
    create_failures: VecDeque<BridgeError>,
    list_gates: VecDeque<Arc<Notify>>,
    create_gates: VecDeque<Arc<Notify>>,
}

/// Scripted stand-in for the integration platform.
pub struct ScriptedBridge {
    list_action: String,
    create_action: String,
    state: Mutex<ScriptState>,
}

impl ScriptedBridge {
    /// Bridge answering `list_action` and `create_action` on any connection.
    #[must_use]
    pub fn new(list_action: impl Into<String>, create_action: impl Into<String>) -> Self {
        Self {
            list_action: list_action.into(),
            create_action: create_action.into(),
            state: Mutex::new(ScriptState {
                next_id: 1,
                ..ScriptState::default()
            }),
        }
    }

    /// Bridge using the default contact action keys.
    #[must_use]
    pub fn contacts() -> Self {
        Self::new("list-data-records", "create-contact")
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed the store with raw connector records.
    #[must_use]
    pub fn with_records(self, records: impl IntoIterator<Item = Value>) -> Self {
        self.state().records.extend(records);
        self
    }

    /// Add a raw record directly to the store, bypassing the create action.
    pub fn insert_record(&self, record: Value) {
        self.state().records.push(record);
    }

    /// Raw records currently in the store.
    #[must_use]
    pub fn stored_records(&self) -> Vec<Value> {
        self.state().records.clone()
    }

    /// Fail the next list call with `error`.
    pub fn fail_next_list(&self, error: BridgeError) {
        self.state().list_failures.push_back(error);
    }

    /// Fail the next create call with `error`.
    pub fn fail_next_create(&self, error: BridgeError) {
        self.state().create_failures.push_back(error);
    }

    /// Fail the next create call the way a connector rejection looks.
    pub fn reject_next_create(&self, message: &str) {
        self.fail_next_create(BridgeError::Platform(PlatformError::new(
            400,
            json!({ "data": { "response": { "data": { "message": message } } } }),
        )));
    }

    /// Hold the next list call until the returned gate is released.
    ///
    /// The records a held list call returns are captured when the call
    /// arrives, so a held call answers with a stale view of the store.
    #[must_use]
    pub fn hold_next_list(&self) -> Gate {
        let notify = Arc::new(Notify::new());
        self.state().list_gates.push_back(Arc::clone(&notify));
        Gate(notify)
    }

    /// Hold the next create call until the returned gate is released.
    #[must_use]
    pub fn hold_next_create(&self) -> Gate {
        let notify = Arc::new(Notify::new());
        self.state().create_gates.push_back(Arc::clone(&notify));
        Gate(notify)
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of calls received for `action`.
    #[must_use]
    pub fn call_count(&self, action: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.action == action)
            .count()
    }

    async fn list(&self) -> Result<Value, BridgeError> {
        let (gate, snapshot, failure) = {
            let mut state = self.state();
            (
                state.list_gates.pop_front(),
                state.records.clone(),
                state.list_failures.pop_front(),
            )
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(json!({ "records": snapshot })),
        }
    }

    async fn create(&self, input: Option<Value>) -> Result<Value, BridgeError> {
        let (gate, failure) = {
            let mut state = self.state();
            (state.create_gates.pop_front(), state.create_failures.pop_front())
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = failure {
            return Err(error);
        }

        let input = input.unwrap_or(Value::Null);
        let mut state = self.state();
        // Seeded records use bare numbers; created ones never collide with them.
        let id = format!("hs-{}", state.next_id);
        state.next_id += 1;
        state.records.push(json!({
            "id": id,
            "name": input.get("fullName").cloned().unwrap_or(Value::Null),
            "fields": {
                "email": input.get("email").cloned().unwrap_or(Value::Null),
                "phone": input.get("phone").cloned().unwrap_or(Value::Null),
                "company": input.get("company_name").cloned().unwrap_or(Value::Null),
                "salutation": input.get("pronouns").cloned().unwrap_or(Value::Null),
            },
            "createdTime": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "uri": format!("/contacts/{id}"),
        }));

        Ok(json!({ "id": id }))
    }
}

impl ActionBridge for ScriptedBridge {
    async fn run(
        &self,
        connection: &str,
        action: &str,
        input: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        self.state().calls.push(RecordedCall {
            connection: connection.to_owned(),
            action: action.to_owned(),
            input: input.cloned(),
        });

        if action == self.list_action {
            self.list().await
        } else if action == self.create_action {
            self.create(input.cloned()).await
        } else {
            Err(BridgeError::Platform(PlatformError::new(
                404,
                json!({ "message": format!("Action {action} not found") }),
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_created_ids_never_collide_with_seeded_ids() {
        let bridge = ScriptedBridge::contacts().with_records([json!({ "id": "1" })]);
        bridge.insert_record(json!({ "id": "2" }));

        let first = bridge
            .run("hubspot", "create-contact", Some(&json!({ "fullName": "Bo" })))
            .await
            .unwrap();
        let second = bridge
            .run("hubspot", "create-contact", Some(&json!({ "fullName": "Cy" })))
            .await
            .unwrap();

        let ids: Vec<Value> = bridge
            .stored_records()
            .into_iter()
            .map(|record| record["id"].clone())
            .collect();
        assert_eq!(ids, [json!("1"), json!("2"), json!("hs-1"), json!("hs-2")]);
        assert_eq!(first["id"], "hs-1");
        assert_eq!(second["id"], "hs-2");
    }

    #[tokio::test]
    async fn test_unknown_action_is_a_platform_error() {
        let bridge = ScriptedBridge::contacts();

        let result = bridge.run("hubspot", "delete-contact", None).await;

        assert!(matches!(result, Err(BridgeError::Platform(_))));
        assert_eq!(bridge.call_count("delete-contact"), 1);
    }
}
