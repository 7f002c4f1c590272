//! Survey endpoint access layer.
//!
//! - `SurveyApi`: the trait every caller programs against
//! - `RemoteClient`: reqwest implementation for the real endpoint
//! - `MockApi`: in-memory implementation for tests

pub mod http;
pub mod mock;
pub mod traits;

pub use http::RemoteClient;
pub use mock::MockApi;
pub use traits::SurveyApi;
