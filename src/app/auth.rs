use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

/// The identity attached to authenticated requests, decoded from the
/// bearer token without a database round trip.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Success {
        user: User,
        token: String,
        expires_at: OffsetDateTime,
    },
    /// Missing account and deactivated account are deliberately
    /// indistinguishable to the caller.
    UnknownAccount,
    InvalidCredentials,
    Banned {
        reason: Option<String>,
        until: OffsetDateTime,
    },
}

#[derive(Clone)]
pub struct AuthService {
    db: Db,
    key: [u8; 32],
    token_ttl_hours: u64,
}

impl AuthService {
    pub fn new(db: Db, key: [u8; 32], token_ttl_hours: u64) -> Self {
        Self {
            db,
            key,
            token_ttl_hours,
        }
    }

    /// Create an account. Returns `None` if the username or email is
    /// already taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<(User, String, OffsetDateTime)>> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.db.pool())
        .await?;

        if taken {
            return Ok(None);
        }

        let password_hash = hash_password(password)?;
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING id, username, email, bio, profile_picture, is_active, is_admin, \
                       banned_until, ban_reason, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.db.pool())
        .await?;

        let user = user_from_row(&row);
        let (token, expires_at) = self.issue_token(&user)?;
        Ok(Some((user, token, expires_at)))
    }

    /// Authenticate and run the ban lifecycle: an expired ban is cleared
    /// before the credentials are checked; an active ban denies login.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, bio, profile_picture, is_active, \
                    is_admin, banned_until, ban_reason, created_at \
             FROM users WHERE username = $1 OR email = $1",
        )
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(LoginOutcome::UnknownAccount),
        };

        let mut user = user_from_row(&row);
        if !user.is_active {
            return Ok(LoginOutcome::UnknownAccount);
        }

        if let Some(until) = user.banned_until {
            if until > OffsetDateTime::now_utc() {
                return Ok(LoginOutcome::Banned {
                    reason: user.ban_reason,
                    until,
                });
            }
            sqlx::query(
                "UPDATE users SET banned_until = NULL, ban_reason = NULL WHERE id = $1",
            )
            .bind(user.id)
            .execute(self.db.pool())
            .await?;
            user.banned_until = None;
            user.ban_reason = None;
        }

        let password_hash: String = row.get("password_hash");
        if !verify_password(password, &password_hash)? {
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let (token, expires_at) = self.issue_token(&user)?;
        Ok(LoginOutcome::Success {
            user,
            token,
            expires_at,
        })
    }

    pub fn authenticate(&self, token: &str) -> Result<Option<Identity>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with("forkful");
        rules.validate_audience_with("forkful");

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let claims = match trusted.payload_claims() {
            Some(claims) => claims,
            None => return Ok(None),
        };

        let user_id = match claim_str(claims, "sub").and_then(|value| Uuid::parse_str(value).ok())
        {
            Some(user_id) => user_id,
            None => return Ok(None),
        };
        let username = match claim_str(claims, "username") {
            Some(username) => username.to_string(),
            None => return Ok(None),
        };
        let email = match claim_str(claims, "email") {
            Some(email) => email.to_string(),
            None => return Ok(None),
        };

        Ok(Some(Identity {
            user_id,
            username,
            email,
        }))
    }

    pub fn issue_token(&self, user: &User) -> Result<(String, OffsetDateTime)> {
        let duration = std::time::Duration::from_secs(self.token_ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer("forkful")?;
        claims.audience("forkful")?;
        claims.subject(&user.id.to_string())?;
        claims.add_additional("username", user.username.as_str())?;
        claims.add_additional("email", user.email.as_str())?;

        let key = SymmetricKey::<V4>::from(&self.key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        let expires_at =
            OffsetDateTime::now_utc() + Duration::hours(self.token_ttl_hours as i64);
        Ok((token, expires_at))
    }
}

pub(crate) fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        bio: row.get("bio"),
        profile_picture: row.get("profile_picture"),
        is_active: row.get("is_active"),
        is_admin: row.get("is_admin"),
        banned_until: row.get("banned_until"),
        ban_reason: row.get("ban_reason"),
        created_at: row.get("created_at"),
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn claim_str<'a>(claims: &'a Claims, name: &str) -> Option<&'a str> {
    claims.get_claim(name).and_then(|value| value.as_str())
}
