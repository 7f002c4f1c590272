//! Logged-in user session
//!
//! Exactly one user record is kept at a time. It is created on successful
//! login, read when the app resumes, and removed on logout. The file store
//! keeps it under a single key of a small JSON key-value file; a missing key
//! or file means "not logged in".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::Result;
use crate::value::{FieldValue, Row};

/// Key holding the serialized user record
pub const SESSION_KEY: &str = "TH_USER";

/// Role of the logged-in user, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Crp,
    Admin,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "crp" => Role::Crp,
            "admin" => Role::Admin,
            _ => Role::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Crp => "crp",
            Role::Admin => "admin",
            Role::Other(role) => role,
        }
    }
}

/// Landing view after login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Home {
    CrpDashboard,
    AdminDashboard,
}

/// The logged-in user record, kept exactly as the endpoint returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    record: Map<String, Value>,
}

impl Session {
    pub fn from_record(record: Map<String, Value>) -> Self {
        Self { record }
    }

    /// Only JSON objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(record) => Some(Self::from_record(record)),
            _ => None,
        }
    }

    /// Raw user record
    pub fn record(&self) -> &Map<String, Value> {
        &self.record
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.record.clone())
    }

    /// Schema-less view of the record.
    pub fn row(&self) -> Row {
        self.record
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from(v.clone())))
            .collect()
    }

    fn cell(&self, key: &str) -> FieldValue {
        self.record
            .get(key)
            .cloned()
            .map(FieldValue::from)
            .unwrap_or_default()
    }

    /// Text of a field; integers keep every digit.
    fn text(&self, key: &str) -> Option<String> {
        match self.record.get(key)? {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            other => FieldValue::from(other.clone()).render(),
        }
    }

    pub fn id(&self) -> Option<String> {
        if !self.cell("id").is_truthy() {
            return None;
        }
        self.text("id").map(|s| s.trim().to_string())
    }

    pub fn username(&self) -> Option<String> {
        self.text("username")
    }

    /// Role with case normalized; a missing role parses as empty.
    pub fn role(&self) -> Role {
        Role::parse(&self.text("role").unwrap_or_default())
    }

    /// `crp` users land on the CRP dashboard, everyone else on the admin one.
    pub fn home(&self) -> Home {
        match self.role() {
            Role::Crp => Home::CrpDashboard,
            _ => Home::AdminDashboard,
        }
    }

    /// CLF the user is assigned to, if any.
    pub fn assigned_clf_id(&self) -> Option<String> {
        if self.cell("assigned_clf_id").is_truthy() {
            self.text("assigned_clf_id")
        } else {
            None
        }
    }
}

/// Persistence for the single session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> Result<()>;

    /// `None` when nobody is logged in.
    async fn load(&self) -> Result<Option<Session>>;

    async fn clear(&self) -> Result<()>;
}

/// Session kept in a JSON key-value file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        let mut entries = self.read_entries().await?;
        entries.insert(SESSION_KEY.to_string(), session.to_value());
        self.write_entries(&entries).await?;
        info!(path = %self.path.display(), user = ?session.username(), "Saved session");
        Ok(())
    }

    async fn load(&self) -> Result<Option<Session>> {
        let mut entries = self.read_entries().await?;
        match entries.remove(SESSION_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let session = Session::from_value(value);
                if session.is_none() {
                    warn!(path = %self.path.display(), "Stored session is not a record, ignoring");
                }
                Ok(session)
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.read_entries().await?;
        if entries.remove(SESSION_KEY).is_some() {
            self.write_entries(&entries).await?;
            info!(path = %self.path.display(), "Cleared session");
        }
        Ok(())
    }
}

/// Session kept in memory (tests, embedding).
#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }
}
