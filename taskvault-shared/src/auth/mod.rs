/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the signup password policy
/// - [`jwt`]: bearer token generation and validation
///
/// Tokens prove identity cryptographically but are only accepted while a
/// matching session row exists, so revocation takes effect immediately.

pub mod jwt;
pub mod password;
