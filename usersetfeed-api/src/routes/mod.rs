/// API route handlers
///
/// - `health`: Health check endpoint
/// - `userset`: User set web service functions

pub mod health;
pub mod userset;
