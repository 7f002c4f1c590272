//! In-memory survey endpoint for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::traits::SurveyApi;
use crate::action::Params;
use crate::outcome::CallOutcome;
use crate::value::FieldValue;

/// Parameters that identify what an action is about, in lookup order.
const KEY_PARAMS: &[&str] = &[
    "table",
    "clf_id",
    "panchayat_id",
    "village_id",
    "shg_id",
    "username",
];

/// Mock endpoint.
///
/// Serves `list`/`read` from in-memory tables and returns canned outcomes
/// for anything registered with [`MockApi::with_response`]. Unregistered
/// actions answer with an empty array.
#[derive(Default)]
pub struct MockApi {
    tables: HashMap<String, Vec<Value>>,
    responses: HashMap<(String, Option<String>), CallOutcome>,
    calls: Mutex<Vec<(String, Params)>>,
    call_count: AtomicU32,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table served by `list` and `read`.
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    /// Canned outcome for `action`; `key` narrows it to one table or parent id.
    pub fn with_response(
        mut self,
        action: impl Into<String>,
        key: Option<&str>,
        outcome: CallOutcome,
    ) -> Self {
        self.responses
            .insert((action.into(), key.map(str::to_string)), outcome);
        self
    }

    /// Total calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Calls made for one action.
    pub fn calls_for(&self, action: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|(a, _)| a == action).count())
            .unwrap_or(0)
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn lookup_key(params: &Params) -> Option<String> {
        KEY_PARAMS
            .iter()
            .find_map(|k| params.get(*k))
            .and_then(|v| FieldValue::from(v.clone()).render())
    }

    fn read_table(&self, params: &Params) -> Value {
        let table = params.get("table").and_then(Value::as_str).unwrap_or_default();
        let field = params
            .get("filterField")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let wanted = params
            .get("filterValue")
            .and_then(|v| FieldValue::from(v.clone()).render());

        let rows = self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        let cell = row.get(field).cloned().unwrap_or(Value::Null);
                        FieldValue::from(cell).render() == wanted
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Value::Array(rows)
    }
}

#[async_trait]
impl SurveyApi for MockApi {
    async fn call(&self, action: &str, params: Params) -> CallOutcome {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((action.to_string(), params.clone()));
        }

        let key = Self::lookup_key(&params);
        if let Some(outcome) = self
            .responses
            .get(&(action.to_string(), key))
            .or_else(|| self.responses.get(&(action.to_string(), None)))
        {
            return outcome.clone();
        }

        match action {
            "list" => {
                let table = params.get("table").and_then(Value::as_str).unwrap_or_default();
                CallOutcome::Ok(Value::Array(
                    self.tables.get(table).cloned().unwrap_or_default(),
                ))
            }
            "read" => CallOutcome::Ok(self.read_table(&params)),
            _ => CallOutcome::Ok(Value::Array(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_tables() {
        let api = MockApi::new().with_table(
            "Panchayat",
            vec![json!({"id": "1", "district_id": 5}), json!({"id": "2", "district_id": 6})],
        );

        assert_eq!(api.list("Panchayat").await.as_array().unwrap().len(), 2);
        assert!(api.list("Missing").await.as_array().unwrap().is_empty());

        let read = api.read("Panchayat", "district_id", json!("6")).await;
        assert_eq!(read.as_array().unwrap()[0]["id"], "2");
        assert_eq!(api.call_count(), 3);
        assert_eq!(api.calls_for("list"), 2);
    }

    #[tokio::test]
    async fn test_mock_keyed_responses() {
        let api = MockApi::new()
            .with_response(
                "villages_by_panchayat",
                Some("102"),
                CallOutcome::TransportFailure {
                    message: "offline".into(),
                },
            )
            .with_response(
                "villages_by_panchayat",
                None,
                CallOutcome::Ok(json!([{"recorded_count": 1}])),
            );

        assert!(!api.villages_by_panchayat("102").await.is_ok());
        assert!(api.villages_by_panchayat("101").await.is_ok());
    }
}
