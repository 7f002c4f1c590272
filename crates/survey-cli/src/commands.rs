//! Command execution
//!
//! Every command resolves to one JSON value printed on stdout.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use survey_client::enterprise::{self, EnterpriseDraft};
use survey_client::hierarchy::{self, PanchayatListing};
use survey_client::value::{filter_by_name, filter_panchayats_by_name};
use survey_client::{
    auth, CallOutcome, ClientConfig, FileSessionStore, Home, MediaFile, RemoteClient, Row,
    SessionStore, SurveyApi, UploadResponse,
};
use tracing::{debug, info};

use crate::cli::{Args, Commands, EnterpriseCommands};

pub async fn run(args: &Args) -> Result<Value> {
    let config = args.client_config().context("Invalid configuration")?;
    debug!(endpoint = %config.endpoint, session_file = %config.session_file.display(), "config");

    let store = FileSessionStore::new(&config.session_file);
    let client = RemoteClient::new(config.clone())?;

    execute(&args.command, &client, &store, &config).await
}

/// Run one command against any endpoint and session store.
pub async fn execute<A, S>(
    command: &Commands,
    api: &A,
    store: &S,
    config: &ClientConfig,
) -> Result<Value>
where
    A: SurveyApi + ?Sized,
    S: SessionStore + ?Sized,
{
    match command {
        Commands::Login { username, password } => {
            let session = auth::login(api, store, username, password).await?;
            Ok(json!({
                "user": session.record(),
                "role": session.role().as_str(),
                "home": home_name(session.home()),
            }))
        }

        Commands::Logout => {
            auth::logout(store).await?;
            Ok(json!({ "logged_out": true }))
        }

        Commands::Whoami => match auth::current_session(store).await? {
            Some(session) => Ok(json!({
                "user": session.record(),
                "role": session.role().as_str(),
                "home": home_name(session.home()),
            })),
            None => Ok(Value::Null),
        },

        Commands::List { table, name } => rows_json(api.list(table).await, name.as_deref()),

        Commands::Read {
            table,
            field,
            value,
        } => strict_json(
            api.read(table, field, Value::String(value.clone()))
                .await,
        ),

        Commands::Panchayats {
            district,
            clf,
            name,
        } => {
            let limit = config.max_concurrent_lookups;
            let listing = match clf {
                Some(clf_id) => hierarchy::panchayats_for_clf(api, clf_id, limit).await?,
                None => {
                    let session = auth::current_session(store).await?;
                    hierarchy::resolve_panchayats(api, session.as_ref(), district.as_deref(), limit)
                        .await?
                }
            };
            Ok(listing_json(&listing, name.as_deref()))
        }

        Commands::Villages { panchayat_id, name } => {
            rows_json(api.villages_by_panchayat(panchayat_id).await, name.as_deref())
        }

        Commands::Shgs { village_id, name } => {
            rows_json(api.shgs_by_village(village_id).await, name.as_deref())
        }

        Commands::Beneficiaries {
            shg_id,
            recorded,
            name,
        } => rows_json(
            api.beneficiaries_by_shg(shg_id, *recorded).await,
            name.as_deref(),
        ),

        Commands::Analytics => strict_json(api.analytics_by_district().await),

        Commands::Enterprise(sub) => enterprise_command(sub, api, store).await,

        Commands::Upload {
            files,
            folder,
            mime,
        } => {
            let mut media = Vec::with_capacity(files.len());
            for path in files {
                let file = MediaFile::from_path(path, mime.as_deref())
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                media.push(file);
            }
            info!(files = media.len(), folder = ?folder, "Uploading media");

            let response = UploadResponse::from_outcome(
                api.upload_media(&media, folder.as_deref()).await,
            )?;
            if response.first_url().is_none() {
                bail!("Upload failed: {}", serde_json::to_string(&response.results)?);
            }
            Ok(serde_json::to_value(&response)?)
        }
    }
}

async fn enterprise_command<A, S>(command: &EnterpriseCommands, api: &A, store: &S) -> Result<Value>
where
    A: SurveyApi + ?Sized,
    S: SessionStore + ?Sized,
{
    match command {
        EnterpriseCommands::Show { beneficiary_id } => {
            match enterprise::load_enterprise(api, beneficiary_id).await? {
                Some(record) => {
                    let certificates = enterprise::certificate_urls(
                        &record.text("certificate_docs").unwrap_or_default(),
                    );
                    Ok(json!({ "record": record, "certificates": certificates }))
                }
                None => Ok(Value::Null),
            }
        }

        EnterpriseCommands::Save {
            beneficiary_id,
            fields,
        } => {
            let existing = enterprise::load_enterprise(api, beneficiary_id).await?;
            let mut draft = existing
                .as_ref()
                .map(EnterpriseDraft::from_record)
                .unwrap_or_default();
            for (field, value) in fields {
                if !draft.set(field, value.clone()) {
                    bail!("Unknown enterprise field: {}", field);
                }
            }

            let session = auth::current_session(store).await?;
            let id = enterprise::submit_enterprise(
                api,
                &draft,
                beneficiary_id,
                existing.as_ref(),
                session.as_ref(),
            )
            .await?;
            Ok(json!({ "id": id, "created": existing.is_none() }))
        }

        EnterpriseCommands::Delete { id } => {
            enterprise::delete_enterprise(api, id).await?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn home_name(home: Home) -> &'static str {
    match home {
        Home::CrpDashboard => "crp_dashboard",
        Home::AdminDashboard => "admin_dashboard",
    }
}

/// The parsed body, or an error for parse/transport/application failures.
fn strict_json(outcome: CallOutcome) -> Result<Value> {
    Ok(outcome.into_result()?)
}

/// Array rows, optionally filtered by name.
fn rows_json(outcome: CallOutcome, name: Option<&str>) -> Result<Value> {
    let rows = outcome.into_rows()?;
    let rows = match name {
        Some(query) => filter_by_name(&rows, query),
        None => rows,
    };
    Ok(serde_json::to_value(rows)?)
}

fn listing_json(listing: &PanchayatListing, name: Option<&str>) -> Value {
    let panchayats: Vec<Row> = match name {
        Some(query) => filter_panchayats_by_name(&listing.panchayats, query),
        None => listing.panchayats.clone(),
    };
    let mut out = json!({ "panchayats": panchayats });
    if listing.is_empty() {
        out["message"] = Value::String(listing.empty_message());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_client::{MemorySessionStore, MockApi};

    fn config() -> ClientConfig {
        ClientConfig::with_endpoint("http://localhost:1/exec")
    }

    fn crp_login_api() -> MockApi {
        MockApi::new().with_response(
            "login",
            None,
            CallOutcome::Ok(json!({
                "success": true,
                "user": {"id": 3, "username": "crp1", "role": "CRP", "assigned_clf_id": "7"}
            })),
        )
    }

    #[tokio::test]
    async fn test_login_then_whoami() {
        let api = crp_login_api();
        let store = MemorySessionStore::new();
        let login = Commands::Login {
            username: "crp1".into(),
            password: "pw".into(),
        };

        let out = execute(&login, &api, &store, &config()).await.unwrap();
        assert_eq!(out["home"], "crp_dashboard");

        let who = execute(&Commands::Whoami, &api, &store, &config()).await.unwrap();
        assert_eq!(who["user"]["username"], "crp1");

        execute(&Commands::Logout, &api, &store, &config()).await.unwrap();
        let who = execute(&Commands::Whoami, &api, &store, &config()).await.unwrap();
        assert!(who.is_null());
    }

    #[tokio::test]
    async fn test_list_with_name_filter() {
        let api = MockApi::new().with_table(
            "Village",
            vec![json!({"id": "1", "name": "Rampur"}), json!({"id": "2", "name": "Sitapur"})],
        );
        let store = MemorySessionStore::new();
        let command = Commands::List {
            table: "Village".into(),
            name: Some("RAM".into()),
        };

        let out = execute(&command, &api, &store, &config()).await.unwrap();
        assert_eq!(out, json!([{"id": "1", "name": "Rampur"}]));
    }

    #[tokio::test]
    async fn test_transport_failure_is_an_error() {
        let api = MockApi::new().with_response(
            "analytics_by_district",
            None,
            CallOutcome::TransportFailure {
                message: "offline".into(),
            },
        );
        let store = MemorySessionStore::new();
        assert!(execute(&Commands::Analytics, &api, &store, &config())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_empty_panchayat_listing_has_message() {
        let api = MockApi::new()
            .with_table("PanchayatsUnderCLF", vec![json!({"clf_id": "9", "panchayat_id": "5"})]);
        let store = MemorySessionStore::new();
        let command = Commands::Panchayats {
            district: None,
            clf: Some("7".into()),
            name: None,
        };

        let out = execute(&command, &api, &store, &config()).await.unwrap();
        assert_eq!(out["panchayats"], json!([]));
        assert_eq!(
            out["message"],
            "No Panchayats found. Mapping rows: 1. Matched mapping rows: 0."
        );
    }

    #[tokio::test]
    async fn test_enterprise_save_rejects_unknown_field() {
        let api = MockApi::new();
        let store = MemorySessionStore::new();
        let command = Commands::Enterprise(EnterpriseCommands::Save {
            beneficiary_id: "b1".into(),
            fields: vec![("favourite_colour".into(), "blue".into())],
        });

        assert!(execute(&command, &api, &store, &config()).await.is_err());
        assert_eq!(api.calls_for("create_or_update_enterprise"), 0);
    }

    #[tokio::test]
    async fn test_enterprise_save_updates_existing() {
        let api = MockApi::new()
            .with_table(
                "BeneficiaryEnterprise",
                vec![json!({"id": "be_5", "beneficiary_id": "b1", "enterprise_name": "Old"})],
            )
            .with_response(
                "create_or_update_enterprise",
                None,
                CallOutcome::Ok(json!({"record": {"id": "be_5"}})),
            );
        let store = MemorySessionStore::new();
        let command = Commands::Enterprise(EnterpriseCommands::Save {
            beneficiary_id: "b1".into(),
            fields: vec![("enterprise_name".into(), "New".into())],
        });

        let out = execute(&command, &api, &store, &config()).await.unwrap();
        assert_eq!(out, json!({"id": "be_5", "created": false}));
    }
}
