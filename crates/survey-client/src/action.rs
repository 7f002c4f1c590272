//! Action names and request encoding
//!
//! Every request names a server-side action. Write-like actions, and any
//! request carrying a `payload`, go out as a JSON POST body; everything else
//! is a GET with the parameters in the query string.

use crate::value::FieldValue;
use reqwest::Url;
use serde_json::{Map, Value};

/// Request parameters (action-specific fields, possibly nested objects).
pub type Params = Map<String, Value>;

/// Logical actions understood by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
    Login,
    PanchayatsByClf,
    VillagesByPanchayat,
    ShgsByVillage,
    BeneficiariesByShg,
    AnalyticsByDistrict,
    UploadMedia,
    CreateOrUpdateEnterprise,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Login => "login",
            Action::PanchayatsByClf => "panchayats_by_clf",
            Action::VillagesByPanchayat => "villages_by_panchayat",
            Action::ShgsByVillage => "shgs_by_village",
            Action::BeneficiariesByShg => "beneficiaries_by_shg",
            Action::AnalyticsByDistrict => "analytics_by_district",
            Action::UploadMedia => "upload_media",
            Action::CreateOrUpdateEnterprise => "create_or_update_enterprise",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that always travel as a POST body.
pub const WRITE_ACTIONS: &[&str] = &["upload_media", "create", "update", "login"];

/// HTTP shape of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Get,
    Post,
}

/// Pick the transport for an action; deterministic in action name and
/// whether `params` has a `payload` key.
pub fn select_transport(action: &str, params: &Params) -> Transport {
    if WRITE_ACTIONS.contains(&action) || params.contains_key("payload") {
        Transport::Post
    } else {
        Transport::Get
    }
}

/// Text form of a query parameter; `None` for null values, which are skipped.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        scalar => FieldValue::from(scalar.clone()).render(),
    }
}

/// GET URL: `action` first, then every non-null parameter.
pub fn build_get_url(endpoint: &Url, action: &str, params: &Params) -> Url {
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("action", action);
        for (key, value) in params {
            if let Some(text) = query_value(value) {
                query.append_pair(key, &text);
            }
        }
    }
    url
}

/// POST body: all parameters plus `action` at the top level.
pub fn build_post_body(action: &str, params: &Params) -> Value {
    let mut body = params.clone();
    body.insert("action".to_string(), Value::String(action.to_string()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_write_actions_use_post() {
        for action in ["create", "update", "login", "upload_media"] {
            assert_eq!(select_transport(action, &Params::new()), Transport::Post);
        }
    }

    #[test]
    fn test_payload_forces_post() {
        let p = params(json!({"payload": {"id": "be_1"}}));
        assert_eq!(select_transport("create_or_update_enterprise", &p), Transport::Post);
        assert_eq!(select_transport("list", &p), Transport::Post);
    }

    #[test]
    fn test_reads_use_get() {
        let p = params(json!({"table": "Panchayat"}));
        assert_eq!(select_transport("list", &p), Transport::Get);
        assert_eq!(select_transport("delete", &p), Transport::Get);
    }

    #[test]
    fn test_get_url_encoding() {
        let endpoint = Url::parse("https://example.test/exec").unwrap();
        let p = params(json!({
            "table": "Panchayat",
            "id": 101,
            "skip": null,
            "filter": {"a": 1},
            "recorded": "true"
        }));
        let url = build_get_url(&endpoint, "list", &p);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(pairs[0], ("action".to_string(), "list".to_string()));
        assert!(pairs.contains(&("table".to_string(), "Panchayat".to_string())));
        assert!(pairs.contains(&("id".to_string(), "101".to_string())));
        assert!(pairs.contains(&("filter".to_string(), "{\"a\":1}".to_string())));
        assert!(pairs.contains(&("recorded".to_string(), "true".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "skip"));
    }

    #[test]
    fn test_post_body_carries_action() {
        let p = params(json!({"username": "crp1", "password": "pw", "action": "ignored"}));
        let body = build_post_body("login", &p);
        assert_eq!(body["action"], "login");
        assert_eq!(body["username"], "crp1");
    }
}
