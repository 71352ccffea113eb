use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{TokenPair, User},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub token_type: TokenType,
    /// Unique token id, the blacklist key
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::TokenInvalid("subject is not a user id".to_string()))
    }

    /// Seconds until expiry, never below one
    fn remaining_secs(&self) -> u64 {
        (self.exp - Utc::now().timestamp()).max(1) as u64
    }
}

/// Issues, verifies, rotates and revokes bearer tokens
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    cache: Cache,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64, cache: Cache) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs: access_ttl_secs as i64,
            refresh_ttl_secs: refresh_ttl_secs as i64,
            cache,
        }
    }

    fn sign(&self, user_id: i64, username: &str, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
        };

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            token_type,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + ttl,
        };
        self.sign_claims(&claims)
    }

    fn sign_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))
    }

    fn issue(&self, user_id: i64, username: &str) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.sign(user_id, username, TokenType::Access)?,
            refresh: self.sign(user_id, username, TokenType::Refresh)?,
        })
    }

    /// Fresh access/refresh pair for a user
    pub fn issue_pair(&self, user: &User) -> AppResult<TokenPair> {
        self.issue(user.id, &user.username)
    }

    /// Decodes a token and checks its signature, expiry and type
    pub fn verify(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| AppError::TokenInvalid(e.to_string()))?
            .claims;

        if claims.token_type != expected {
            return Err(AppError::TokenInvalid(format!(
                "expected {:?} token",
                expected
            )));
        }
        Ok(claims)
    }

    /// Blacklists the token for the rest of its lifetime
    ///
    /// The blacklist entry is claimed atomically, so a token can be consumed once
    /// even when two requests present it at the same moment.
    async fn consume(&self, claims: &Claims) -> AppResult<()> {
        let claimed = self
            .cache
            .mark_once(
                &CacheKey::RevokedToken(claims.jti.clone()),
                claims.remaining_secs(),
            )
            .await?;
        if !claimed {
            return Err(AppError::TokenInvalid("token is blacklisted".to_string()));
        }
        Ok(())
    }

    /// Exchanges a refresh token for a new pair; the presented token is blacklisted
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        let user_id = claims.user_id()?;

        self.consume(&claims).await?;
        tracing::debug!(user_id, "Refresh token rotated");

        self.issue(user_id, &claims.username)
    }

    /// Blacklists a refresh token belonging to `user_id`
    pub async fn revoke(&self, refresh_token: &str, user_id: i64) -> AppResult<()> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        if claims.user_id()? != user_id {
            return Err(AppError::TokenInvalid(
                "refresh token belongs to another user".to_string(),
            ));
        }

        self.consume(&claims).await?;
        tracing::info!(user_id, "Refresh token revoked");
        Ok(())
    }
}
