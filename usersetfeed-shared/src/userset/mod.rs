/// User set creation with profile based auto-association
///
/// # Modules
///
/// - [`fields`]: custom field and profile field lookups
/// - [`schema`]: request and response parameter schemas
/// - [`input`]: typed view of a validated request
/// - [`autoassociate`]: auto-association rule validation (codes -1, -2, -3, -5)
/// - [`expiry`]: expiry date validation (codes -6, -7)
/// - [`writer`]: user set persistence
/// - [`predicate`]: profile match predicate
/// - [`reconcile`]: rule diffing and membership regeneration
/// - [`create`]: the `userset_create` flow
/// - [`error`]: error and message code types
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use usersetfeed_shared::auth::middleware::AuthContext;
/// use usersetfeed_shared::store::memory::MemoryStore;
/// use usersetfeed_shared::userset::{create::create_userset, UsersetSettings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let settings = UsersetSettings { expiry_field_id: Some(11) };
/// let auth = AuthContext::with_capabilities(2, vec!["*".to_string()]);
///
/// let data = json!({"name": "testusersetname"});
/// let response = create_userset(&store, &settings, &auth, &data).await?;
/// println!("{}: {}", response.messagecode, response.message);
/// # Ok(())
/// # }
/// ```

pub mod autoassociate;
pub mod create;
pub mod error;
pub mod expiry;
pub mod fields;
pub mod input;
pub mod predicate;
pub mod reconcile;
pub mod schema;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Prefix of custom field parameter names
pub const CUSTOM_FIELD_PREFIX: &str = "field_";

/// Expiry used when the request has none
pub const DEFAULT_EXPIRY: &str = "2000-01-01 00:00:00";

/// Capability required to create user sets
pub const CREATE_CAPABILITY: &str = "local/elisprogram:userset_create";

/// Process wide settings of the user set flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersetSettings {
    /// Custom field holding user set expiry dates
    pub expiry_field_id: Option<i64>,
}
