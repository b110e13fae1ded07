use jsonwebtoken::encode;
use uuid::Uuid;

use crate::entities::sea_orm_active_enums::UserRole;

pub mod api;

/// Represents the currently authenticated caller, as established by the
/// authentication middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl CurrentUser {
    /// Creates a new CurrentUser instance.
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Returns whether the caller holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub exp: usize,      // Expiry time of the token
    pub iat: usize,      // Issued at time of the token
    pub user_id: Uuid,   // Identifier of the authenticated user
    pub role: UserRole,  // Role carried into authorization checks
}

pub async fn encode_jwt(user_id: Uuid, role: UserRole, jwt_secret: &str) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let expire = chrono::Duration::hours(24);
    let exp = (now + expire).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        exp,
        iat,
        user_id,
        role,
    };
    let jwt = encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

pub async fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )?;
    Ok(token_data.claims)
}
