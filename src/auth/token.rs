use async_graphql::SimpleObject;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Session;

/// The ``role`` claim every session token carries
pub const AUTHENTICATED_ROLE: &str = "authenticated";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
/// Claims
///
/// Represents the different field in the JWT
pub struct Claims {
    /// expires at unix timestamp
    pub(crate) exp: i64,
    /// issued at unix timestamp
    pub(crate) iat: i64,
    /// the user this session belongs to
    pub(crate) sub: Uuid,
    /// not valid before unix timestamp
    pub(crate) nbf: i64,
    /// the id of this token
    pub(crate) jti: Uuid,
    /// the session id
    pub(crate) sid: Uuid,
    /// if its a refresh token or not
    pub(crate) rft: bool,
    /// database role of the session
    pub(crate) role: String,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn session_id(&self) -> Uuid {
        self.sid
    }

    #[cfg(test)]
    pub(crate) fn for_user(user_id: Uuid) -> Self {
        let now = Utc::now().timestamp();
        Self {
            exp: now + 3600,
            iat: now,
            sub: user_id,
            nbf: now,
            jti: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            rft: false,
            role: AUTHENTICATED_ROLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
/// TokenPair
///
/// Contains a access token and the refresh token to request the next ``TokenPair``
#[non_exhaustive]
pub struct TokenPair {
    /// The token that is used for authentication in the [``Authorization`` header][1].
    /// The format is ``Authorization: Bearer <token>``.
    ///
    /// [1]: https://developer.mozilla.org/en-US/docs/Web/HTTP/Headers/Authorization
    pub access_token: String,
    /// The token used to request the next ``TokenPair``
    pub refresh_token: String,

    /// the corresponding [``Session``] object
    pub session: Session,
}

impl TokenPair {
    /// Generate a new TokenPair from a [``Session``]
    pub fn new(session: Session, key: &EncodingKey) -> Result<Self, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let header = Header::new(Algorithm::HS256);

        let claims = Claims {
            exp: session.expires_at.timestamp(),
            iat: now,
            jti: Uuid::new_v4(),
            sid: session.session_id,
            nbf: now,
            rft: false,
            sub: session.user_id,
            role: AUTHENTICATED_ROLE.to_string(),
        };
        let access_token = encode(&header, &claims, key)?;

        let claims = Claims {
            exp: (session.expires_at + Duration::days(7)).timestamp(),
            jti: Uuid::new_v4(),
            rft: true,
            ..claims
        };
        let refresh_token = encode(&header, &claims, key)?;

        Ok(Self {
            access_token,
            refresh_token,
            session,
        })
    }
}

/// Decodes an access token. Refresh tokens and invalid or expired tokens yield ``None``.
pub fn decode_access_token(token: &str, key: &DecodingKey) -> Option<Claims> {
    lazy_static! {
        static ref VALIDATION: Validation = Validation::new(Algorithm::HS256);
    }
    let token = decode::<Claims>(token, key, &VALIDATION).ok()?;
    // refresh tokens are not authentication tokens
    if token.claims.rft {
        return None;
    }
    Some(token.claims)
}
