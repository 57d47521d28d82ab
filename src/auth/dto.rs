use serde::Serialize;
use uuid::Uuid;

/// Response for a freshly minted identity.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub identity_id: Uuid,
    pub access_token: String,
}
