/// Bearer token generation and validation
///
/// Tokens are JWTs signed with HS256. They carry the user id (`sub`) and
/// the session id (`jti`) but no expiration claim: sessions are long-lived
/// and end only on explicit revocation, which the auth guard enforces by
/// checking the token against the sessions table on every request. A token
/// that verifies here can still be rejected there.
///
/// `jti` doubles as a uniqueness nonce — without it, two tokens minted for
/// the same user within the same second would sign identical payloads and
/// collide on the sessions table's unique token column.
///
/// # Example
///
/// ```
/// use taskvault_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let claims = Claims::new(user_id, Uuid::new_v4());
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!")?;
///
/// let validated = validate_token(&token, "secret-key-at-least-32-bytes-long!")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "taskvault";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user id
    pub sub: Uuid,

    /// Issuer - always "taskvault"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Token id - the session row this token belongs to
    pub jti: Uuid,
}

impl Claims {
    /// Creates claims for a new session
    pub fn new(user_id: Uuid, session_id: Uuid) -> Self {
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: Utc::now().timestamp(),
            jti: session_id,
        }
    }
}

/// Signs claims into a token string
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token's signature and structure, returning its claims
///
/// Verifies the HS256 signature and the issuer. There is no expiration
/// check: lifetime is governed entirely by session revocation.
///
/// # Errors
///
/// Returns an error if the signature is invalid, the token is malformed,
/// or the issuer does not match.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    // No exp claim is issued, so drop the default requirement for one
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.set_issuer(&[ISSUER]);

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}
