//! Survey Client - Field Survey Endpoint Access
//!
//! Client side of the rural-development field survey program:
//! - One generic remote call (`action` + parameters) that never fails,
//!   only yields a [`CallOutcome`]
//! - Panchayat listing with a client-side fallback over the raw tables
//! - Local session storage and login
//! - Media upload payloads and enterprise record helpers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  hierarchy / auth / enterprise / media   │
//! └────────────────────┬─────────────────────┘
//!                      ▼
//!              ┌───────────────┐
//!              │   SurveyApi   │
//!              └───────┬───────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//!   ┌──────────────┐        ┌──────────────┐
//!   │ RemoteClient │        │   MockApi    │
//!   │  (reqwest)   │        │  (in-memory) │
//!   └──────────────┘        └──────────────┘
//! ```

pub mod action;
pub mod api;
pub mod auth;
pub mod config;
pub mod enterprise;
pub mod error;
pub mod gather;
pub mod hierarchy;
pub mod media;
pub mod outcome;
pub mod session;
pub mod value;

// Re-export main types for convenience
pub use action::{Action, Params, Transport};
pub use api::{MockApi, RemoteClient, SurveyApi};
pub use config::ClientConfig;
pub use enterprise::EnterpriseDraft;
pub use error::{ClientError, EnterpriseError, FetchError, LoginError, Result};
pub use hierarchy::{resolve_panchayats, ListingSource, PanchayatListing};
pub use media::{MediaFile, UploadResponse};
pub use outcome::CallOutcome;
pub use session::{FileSessionStore, Home, MemorySessionStore, Role, Session, SessionStore};
pub use value::{FieldValue, Row};
