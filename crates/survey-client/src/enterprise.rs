//! Beneficiary enterprise records
//!
//! One record per beneficiary in the `BeneficiaryEnterprise` table. Every
//! form field is kept as text; the server stores whatever it is sent.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::api::SurveyApi;
use crate::error::{EnterpriseError, FetchError};
use crate::outcome::CallOutcome;
use crate::session::Session;
use crate::value::{FieldValue, Row};

pub const ENTERPRISE_TABLE: &str = "BeneficiaryEnterprise";

/// Column linking a record to its beneficiary
pub const ENTERPRISE_KEY: &str = "beneficiary_id";

/// Form fields, in display order.
pub const ENTERPRISE_FIELDS: &[&str] = &[
    "enterprise_name",
    "enterprise_type",
    "ownership_type",
    "year_of_establishment",
    "raw_material",
    "machinery_equipment",
    "workplace_type",
    "electricity_available",
    "water_available",
    "transportation_facility",
    "initial_investment",
    "source_of_investment",
    "working_capital_monthly",
    "annual_turnover",
    "profit_percentage",
    "loan_details",
    "main_product_service",
    "product_features",
    "production_capacity",
    "packaging_branding_status",
    "certification_registration",
    "target_customers",
    "marketing_channels",
    "monthly_sales",
    "marketing_strategy",
    "marketing_challenges",
    "training_received",
    "skills_acquired",
    "future_training_requirements",
    "institutional_support",
    "financial_coordination",
    "market_linkage",
    "mentorship_support",
    "expansion_plan",
    "required_support",
    "photo_enterprise",
    "photo_entrepreneur",
    "photo_product",
    "certificate_docs",
];

/// Fetch the saved record for a beneficiary, if there is one.
///
/// Any valid JSON that is not a non-empty array means "no record yet".
pub async fn load_enterprise<A>(api: &A, beneficiary_id: &str) -> Result<Option<Row>, FetchError>
where
    A: SurveyApi + ?Sized,
{
    let outcome = api
        .read(
            ENTERPRISE_TABLE,
            ENTERPRISE_KEY,
            Value::String(beneficiary_id.to_string()),
        )
        .await;

    match outcome {
        CallOutcome::Ok(Value::Array(items)) => {
            Ok(items.into_iter().next().and_then(Row::from_value))
        }
        CallOutcome::Ok(_) => Ok(None),
        CallOutcome::ParseFailure { status, text } => Err(FetchError::Parse { status, text }),
        CallOutcome::TransportFailure { message } => Err(FetchError::Transport { message }),
    }
}

/// Form state: every field as text, empty when unset.
#[derive(Debug, Clone, PartialEq)]
pub struct EnterpriseDraft {
    fields: BTreeMap<String, String>,
}

impl Default for EnterpriseDraft {
    fn default() -> Self {
        Self {
            fields: ENTERPRISE_FIELDS
                .iter()
                .map(|f| (f.to_string(), String::new()))
                .collect(),
        }
    }
}

impl EnterpriseDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from a saved record; missing or null cells stay empty.
    pub fn from_record(record: &Row) -> Self {
        let mut draft = Self::default();
        for field in ENTERPRISE_FIELDS {
            if let Some(text) = record.text(field) {
                draft.fields.insert(field.to_string(), text);
            }
        }
        draft
    }

    /// Set a form field; returns `false` for names outside [`ENTERPRISE_FIELDS`].
    pub fn set(&mut self, field: &str, value: impl Into<String>) -> bool {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn validate(&self) -> Result<(), EnterpriseError> {
        if self.get("enterprise_name").trim().is_empty() {
            return Err(EnterpriseError::MissingName);
        }
        Ok(())
    }
}

/// Assemble the record sent to `create_or_update_enterprise`.
///
/// An existing record keeps its id and creation time; a new one gets a
/// `be_<unix-millis>` id and `created_at`. No value in the payload is null.
pub fn build_payload(
    draft: &EnterpriseDraft,
    beneficiary_id: &str,
    existing: Option<&Row>,
    session: Option<&Session>,
    now: DateTime<Utc>,
) -> Value {
    let mut payload: Map<String, Value> = draft
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    payload.insert(
        ENTERPRISE_KEY.to_string(),
        Value::String(beneficiary_id.to_string()),
    );

    let id = existing
        .and_then(Row::id)
        .unwrap_or_else(|| format!("be_{}", now.timestamp_millis()));
    payload.insert("id".to_string(), Value::String(id));

    if let Some(user_id) = session.and_then(|s| s.record().get("id")) {
        if FieldValue::from(user_id.clone()).is_truthy() {
            payload.insert("recorded_by_user_id".to_string(), user_id.clone());
        }
    }

    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    if existing.is_none() {
        payload.insert("created_at".to_string(), Value::String(timestamp.clone()));
    }
    payload.insert("updated_at".to_string(), Value::String(timestamp));

    for value in payload.values_mut() {
        if value.is_null() {
            *value = Value::String(String::new());
        }
    }

    Value::Object(payload)
}

/// Whether a save response confirms the write.
pub fn save_confirmed(body: &Value) -> bool {
    let truthy = |key: &str| {
        body.get(key)
            .map(|v| FieldValue::from(v.clone()).is_truthy())
            .unwrap_or(false)
    };
    body.get("success") == Some(&Value::Bool(true)) || truthy("record") || truthy("saved")
}

fn rejection(body: &Value) -> EnterpriseError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    EnterpriseError::Rejected(message)
}

/// Send a payload built by [`build_payload`] and check the confirmation.
pub async fn save_enterprise<A>(api: &A, payload: Value) -> Result<Value, EnterpriseError>
where
    A: SurveyApi + ?Sized,
{
    let id = payload.get("id").cloned();
    let body = match api.create_or_update_enterprise(payload).await {
        CallOutcome::Ok(body) => body,
        CallOutcome::ParseFailure { status, text } => {
            return Err(FetchError::Parse { status, text }.into())
        }
        CallOutcome::TransportFailure { message } => {
            return Err(FetchError::Transport { message }.into())
        }
    };

    if save_confirmed(&body) {
        info!(id = ?id, "Saved enterprise record");
        Ok(body)
    } else {
        debug!(response = %body, "Enterprise save not confirmed");
        Err(rejection(&body))
    }
}

/// Validate, build and save in one step. Returns the id the record was saved under.
pub async fn submit_enterprise<A>(
    api: &A,
    draft: &EnterpriseDraft,
    beneficiary_id: &str,
    existing: Option<&Row>,
    session: Option<&Session>,
) -> Result<String, EnterpriseError>
where
    A: SurveyApi + ?Sized,
{
    draft.validate()?;
    let payload = build_payload(draft, beneficiary_id, existing, session, Utc::now());
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    save_enterprise(api, payload).await?;
    Ok(id)
}

/// Remove an enterprise record by its own id.
pub async fn delete_enterprise<A>(api: &A, id: &str) -> Result<(), EnterpriseError>
where
    A: SurveyApi + ?Sized,
{
    let body = match api
        .delete(ENTERPRISE_TABLE, Value::String(id.to_string()))
        .await
    {
        CallOutcome::Ok(body) => body,
        CallOutcome::ParseFailure { status, text } => {
            return Err(FetchError::Parse { status, text }.into())
        }
        CallOutcome::TransportFailure { message } => {
            return Err(FetchError::Transport { message }.into())
        }
    };

    let deleted = body
        .get("success")
        .map(|v| FieldValue::from(v.clone()).is_truthy())
        .unwrap_or(false);
    if deleted {
        info!(id, "Deleted enterprise record");
        Ok(())
    } else {
        Err(rejection(&body))
    }
}

/// Links stored in `certificate_docs` (comma separated).
pub fn certificate_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()
    }

    fn named_draft() -> EnterpriseDraft {
        let mut draft = EnterpriseDraft::new();
        draft.set("enterprise_name", "Leaf plates");
        draft
    }

    #[test]
    fn test_validation_requires_name() {
        let mut draft = EnterpriseDraft::new();
        assert!(matches!(draft.validate(), Err(EnterpriseError::MissingName)));
        draft.set("enterprise_name", "   ");
        assert!(draft.validate().is_err());
        assert!(named_draft().validate().is_ok());
    }

    #[test]
    fn test_set_rejects_unknown_field() {
        let mut draft = EnterpriseDraft::new();
        assert!(!draft.set("not_a_field", "x"));
        assert_eq!(draft.get("not_a_field"), "");
    }

    #[test]
    fn test_prefill_from_record() {
        let record = Row::from_value(json!({
            "id": "be_1",
            "enterprise_name": "Tailoring",
            "initial_investment": 5000,
            "loan_details": null
        }))
        .unwrap();
        let draft = EnterpriseDraft::from_record(&record);
        assert_eq!(draft.get("enterprise_name"), "Tailoring");
        assert_eq!(draft.get("initial_investment"), "5000");
        assert_eq!(draft.get("loan_details"), "");
    }

    #[test]
    fn test_payload_for_new_record() {
        let session = Session::from_value(json!({"id": 9, "role": "crp"})).unwrap();
        let payload = build_payload(&named_draft(), "ben-4", None, Some(&session), fixed_now());

        assert_eq!(payload["id"], json!(format!("be_{}", fixed_now().timestamp_millis())));
        assert_eq!(payload["beneficiary_id"], "ben-4");
        assert_eq!(payload["recorded_by_user_id"], json!(9));
        assert_eq!(payload["created_at"], "2024-03-01T10:30:00.000Z");
        assert_eq!(payload["updated_at"], "2024-03-01T10:30:00.000Z");
        assert_eq!(payload["photo_product"], "");
    }

    #[test]
    fn test_payload_for_existing_record() {
        let existing = Row::from_value(json!({"id": "be_77", "enterprise_name": "Old"})).unwrap();
        let payload = build_payload(&named_draft(), "ben-4", Some(&existing), None, fixed_now());

        assert_eq!(payload["id"], "be_77");
        assert!(payload.get("created_at").is_none());
        assert!(payload.get("recorded_by_user_id").is_none());
        assert_eq!(payload["enterprise_name"], "Leaf plates");
    }

    #[test]
    fn test_save_confirmation_rule() {
        assert!(save_confirmed(&json!({"success": true})));
        assert!(save_confirmed(&json!({"record": {"id": "be_1"}})));
        assert!(save_confirmed(&json!({"saved": 1})));
        assert!(!save_confirmed(&json!({"success": "yes"})));
        assert!(!save_confirmed(&json!({"saved": false, "record": null})));
    }

    #[test]
    fn test_certificate_urls() {
        assert_eq!(
            certificate_urls(" https://a/1 , ,https://b/2,"),
            vec!["https://a/1".to_string(), "https://b/2".to_string()]
        );
        assert!(certificate_urls("").is_empty());
    }

    #[tokio::test]
    async fn test_load_enterprise_first_row() {
        let api = MockApi::new().with_table(
            ENTERPRISE_TABLE,
            vec![
                json!({"id": "be_1", "beneficiary_id": "b1", "enterprise_name": "A"}),
                json!({"id": "be_2", "beneficiary_id": "b2", "enterprise_name": "B"}),
            ],
        );

        let found = load_enterprise(&api, "b2").await.unwrap().unwrap();
        assert_eq!(found.id().unwrap(), "be_2");
        assert!(load_enterprise(&api, "b3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_enterprise_transport_failure() {
        let api = MockApi::new().with_response(
            "read",
            Some(ENTERPRISE_TABLE),
            CallOutcome::TransportFailure {
                message: "offline".into(),
            },
        );
        let err = load_enterprise(&api, "b1").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_submit_sends_payload() {
        let api = MockApi::new().with_response(
            "create_or_update_enterprise",
            None,
            CallOutcome::Ok(json!({"success": true})),
        );

        let id = submit_enterprise(&api, &named_draft(), "ben-4", None, None)
            .await
            .unwrap();
        assert!(id.starts_with("be_"));

        let calls = api.calls();
        let (action, params) = &calls[0];
        assert_eq!(action, "create_or_update_enterprise");
        assert_eq!(params["payload"]["id"], json!(id));
    }

    #[tokio::test]
    async fn test_submit_invalid_draft_makes_no_call() {
        let api = MockApi::new();
        let err = submit_enterprise(&api, &EnterpriseDraft::new(), "ben-4", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EnterpriseError::MissingName));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_save_rejected() {
        let api = MockApi::new().with_response(
            "create_or_update_enterprise",
            None,
            CallOutcome::Ok(json!({"success": false, "message": "Sheet locked"})),
        );
        match save_enterprise(&api, json!({"id": "be_1"})).await.unwrap_err() {
            EnterpriseError::Rejected(message) => assert_eq!(message, "Sheet locked"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_enterprise() {
        let api = MockApi::new().with_response(
            "delete",
            Some(ENTERPRISE_TABLE),
            CallOutcome::Ok(json!({"success": true})),
        );
        delete_enterprise(&api, "be_1").await.unwrap();

        let refused = MockApi::new().with_response(
            "delete",
            Some(ENTERPRISE_TABLE),
            CallOutcome::Ok(json!({"success": false})),
        );
        assert!(delete_enterprise(&refused, "be_1").await.is_err());
    }
}
