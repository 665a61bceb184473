use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::profiles::Profile, repositories::profiles_repo::ProfilesRepository, Error, Result,
};

/// Verifies bearer tokens issued by the auth backend. Sign-in happens there; this
/// service only maps a token to the caller's profile.
#[derive(Clone)]
pub struct AuthService {
    profiles: Arc<dyn ProfilesRepository>,
    jwt_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    #[serde(default)]
    iat: usize,
}

impl AuthService {
    pub fn new(profiles: Arc<dyn ProfilesRepository>, jwt_secret: String) -> Self {
        Self {
            profiles,
            jwt_secret,
        }
    }

    pub fn decode_token<T: Into<String>>(&self, token: T) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let decoded = decode::<Claims>(
            &token.into(),
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|_| Error::Unauthorized)?;

        Uuid::parse_str(&decoded.claims.sub).map_err(|_| Error::Unauthorized)
    }

    /// Signs a token the same way the auth backend does. Used by local tooling and tests.
    pub fn issue_token(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|_| Error::InternalServerError)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Profile> {
        let user_id = self.decode_token(token)?;
        self.profiles
            .find_profile(user_id)
            .await?
            .ok_or(Error::Unauthorized)
    }
}
