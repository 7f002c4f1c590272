//! Core trait for survey endpoint access.
//!
//! `SurveyApi` has one required method, [`SurveyApi::call`]; every logical
//! action is a provided helper that shapes its parameters and forwards to it.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::action::{Action, Params};
use crate::media::MediaFile;
use crate::outcome::CallOutcome;

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Access to the survey endpoint.
#[async_trait]
pub trait SurveyApi: Send + Sync {
    /// Perform one round trip for `action`.
    ///
    /// Never fails: parse and transport failures come back as
    /// [`CallOutcome`] variants.
    async fn call(&self, action: &str, params: Params) -> CallOutcome;

    /// All rows of a table.
    async fn list(&self, table: &str) -> CallOutcome {
        self.call(Action::List.as_str(), params(json!({ "table": table })))
            .await
    }

    /// Rows of `table` whose `filter_field` equals `filter_value`.
    async fn read(&self, table: &str, filter_field: &str, filter_value: Value) -> CallOutcome {
        self.call(
            Action::Read.as_str(),
            params(json!({
                "table": table,
                "filterField": filter_field,
                "filterValue": filter_value,
            })),
        )
        .await
    }

    async fn create(&self, table: &str, payload: Value) -> CallOutcome {
        self.call(
            Action::Create.as_str(),
            params(json!({ "table": table, "payload": payload })),
        )
        .await
    }

    async fn update(&self, table: &str, payload: Value) -> CallOutcome {
        self.call(
            Action::Update.as_str(),
            params(json!({ "table": table, "payload": payload })),
        )
        .await
    }

    async fn delete(&self, table: &str, id: Value) -> CallOutcome {
        self.call(Action::Delete.as_str(), params(json!({ "table": table, "id": id })))
            .await
    }

    /// Username and password travel at the top level of a POST body.
    async fn login(&self, username: &str, password: &str) -> CallOutcome {
        self.call(
            Action::Login.as_str(),
            params(json!({ "username": username, "password": password })),
        )
        .await
    }

    async fn panchayats_by_clf(&self, clf_id: &str) -> CallOutcome {
        self.call(
            Action::PanchayatsByClf.as_str(),
            params(json!({ "clf_id": clf_id })),
        )
        .await
    }

    async fn villages_by_panchayat(&self, panchayat_id: &str) -> CallOutcome {
        self.call(
            Action::VillagesByPanchayat.as_str(),
            params(json!({ "panchayat_id": panchayat_id })),
        )
        .await
    }

    async fn shgs_by_village(&self, village_id: &str) -> CallOutcome {
        self.call(
            Action::ShgsByVillage.as_str(),
            params(json!({ "village_id": village_id })),
        )
        .await
    }

    /// `recorded` restricts the listing to beneficiaries with a saved
    /// enterprise record; the endpoint expects it as a string.
    async fn beneficiaries_by_shg(&self, shg_id: &str, recorded: bool) -> CallOutcome {
        self.call(
            Action::BeneficiariesByShg.as_str(),
            params(json!({
                "shg_id": shg_id,
                "recorded": if recorded { "true" } else { "false" },
            })),
        )
        .await
    }

    async fn analytics_by_district(&self) -> CallOutcome {
        self.call(Action::AnalyticsByDistrict.as_str(), Params::new())
            .await
    }

    async fn upload_media(&self, files: &[MediaFile], folder_id: Option<&str>) -> CallOutcome {
        let mut payload = json!({ "files": files });
        if let Some(folder_id) = folder_id {
            payload["folderId"] = Value::String(folder_id.to_string());
        }
        self.call(
            Action::UploadMedia.as_str(),
            params(json!({ "payload": payload })),
        )
        .await
    }

    async fn create_or_update_enterprise(&self, record: Value) -> CallOutcome {
        self.call(
            Action::CreateOrUpdateEnterprise.as_str(),
            params(json!({ "payload": record })),
        )
        .await
    }
}
