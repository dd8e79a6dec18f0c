/// Database models for the user set feed
///
/// This module contains the database models and their CRUD operations.
///
/// # Models
///
/// - `profile_field`: Platform user profile fields (auto-association sources)
/// - `custom_field`: Program custom fields and the context levels they attach to
/// - `userset`: User sets (named, hierarchical groups of users)
/// - `userset_profile`: Auto-association rules of a user set
/// - `userset_assignment`: Membership assignments of users to user sets
/// - `user`: Program users, platform users and profile data
///
/// # Example
///
/// ```no_run
/// use usersetfeed_shared::models::userset::{CreateUserset, Userset};
/// use usersetfeed_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let userset = Userset::create(&pool, CreateUserset {
///     name: "Regional managers".to_string(),
///     display: String::new(),
///     parent: 0,
///     custom_fields: Default::default(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod custom_field;
pub mod profile_field;
pub mod user;
pub mod userset;
pub mod userset_assignment;
pub mod userset_profile;
