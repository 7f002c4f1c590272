//! Login and logout

use serde_json::Value;
use tracing::info;

use crate::api::SurveyApi;
use crate::error::{FetchError, LoginError};
use crate::outcome::CallOutcome;
use crate::session::{Session, SessionStore};
use crate::value::FieldValue;

/// Authenticate and persist the returned user record.
///
/// Blank credentials fail before any call is made. A truthy `success` with a
/// `user` record is the only success shape; any other JSON is a rejection
/// carrying the server message.
pub async fn login<A, S>(
    api: &A,
    store: &S,
    username: &str,
    password: &str,
) -> Result<Session, LoginError>
where
    A: SurveyApi + ?Sized,
    S: SessionStore + ?Sized,
{
    if username.trim().is_empty() || password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let body = match api.login(username, password).await {
        CallOutcome::Ok(body) => body,
        CallOutcome::ParseFailure { status, text } => {
            return Err(FetchError::Parse { status, text }.into())
        }
        CallOutcome::TransportFailure { message } => {
            return Err(FetchError::Transport { message }.into())
        }
    };

    let succeeded = body
        .get("success")
        .map(|v| FieldValue::from(v.clone()).is_truthy())
        .unwrap_or(false);
    let user = body.get("user").cloned().and_then(Session::from_value);

    match (succeeded, user) {
        (true, Some(session)) => {
            store.save(&session).await?;
            info!(user = ?session.username(), role = session.role().as_str(), "Logged in");
            Ok(session)
        }
        _ => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("Invalid credentials");
            Err(LoginError::Rejected(message.to_string()))
        }
    }
}

/// Forget the logged-in user.
pub async fn logout<S: SessionStore + ?Sized>(store: &S) -> Result<(), LoginError> {
    store.clear().await?;
    info!("Logged out");
    Ok(())
}

/// Current user, if any.
pub async fn current_session<S: SessionStore + ?Sized>(
    store: &S,
) -> Result<Option<Session>, LoginError> {
    Ok(store.load().await?)
}
