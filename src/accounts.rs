//! Credential flows for exec accounts.
//!
//! Passwords are stored as bcrypt hashes. Reset tokens are handed to the
//! caller once; only their SHA-256 digest is persisted.

use crate::config::RegistryConfig;
use crate::core::{RegistryError, Result, Value};
use crate::gate::{Identity, Role};
use crate::models::Exec;
use crate::schema::{Record, StatementKind, generate};
use crate::store::{self, Database};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 50;
const RESET_TOKEN_BYTES: usize = 32;

/// A freshly issued password reset token.
///
/// `token` is the only copy of the plain token; deliver it to the account
/// owner and drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub exec_id: i64,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Login, password change and password reset for [`Exec`] accounts.
#[derive(Debug, Clone)]
pub struct Accounts {
    db: Database,
    session_ttl: Duration,
    reset_token_ttl: Duration,
}

impl Accounts {
    pub fn new(db: Database, config: &RegistryConfig) -> Self {
        Self {
            db,
            session_ttl: config.session_ttl,
            reset_token_ttl: config.reset_token_ttl,
        }
    }

    /// Creates exec accounts; usernames must be unused and distinct.
    ///
    /// The unique index on `username` still guards the insert itself, so a
    /// concurrent creation loses with `InvalidInput` and nothing is stored.
    pub fn create_execs(&self, caller: &Identity, execs: Vec<Exec>) -> Result<Vec<Exec>> {
        {
            let conn = self.db.connect()?;
            let mut seen = HashSet::with_capacity(execs.len());
            for exec in &execs {
                if !seen.insert(exec.username.as_str())
                    || find_by(&conn, "username", &exec.username)?.is_some()
                {
                    return Err(RegistryError::invalid_input(format!(
                        "username '{}' is already taken",
                        exec.username
                    )));
                }
            }
        }
        self.db.repository::<Exec>().create(caller, execs)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Identity> {
        let conn = self.db.connect()?;
        let rejected = || RegistryError::unauthorized("invalid username or password");

        let Some(exec) = find_by(&conn, "username", username)? else {
            warn!(username, "login for unknown user");
            return Err(rejected());
        };
        if !bcrypt::verify(password, &exec.password)? {
            warn!(username, "login with wrong password");
            return Err(rejected());
        }
        if exec.inactive_status {
            return Err(RegistryError::unauthorized("user is inactive"));
        }

        info!(username, identity = exec.id, "exec logged in");
        self.identity_for(&exec)
    }

    /// Changes a password. The caller must be the account owner or an admin.
    ///
    /// Returns a fresh identity for the account whose password changed.
    pub fn update_password(
        &self,
        caller: &Identity,
        exec_id: i64,
        current: &str,
        new: &str,
    ) -> Result<Identity> {
        if caller.is_expired() {
            return Err(RegistryError::unauthorized("session expired"));
        }
        if caller.user_id != exec_id && caller.role != Role::Admin {
            return Err(RegistryError::unauthorized(
                "only the account owner or an admin can change this password",
            ));
        }
        if current.is_empty() || new.is_empty() {
            return Err(RegistryError::invalid_input(
                "current and new password are both required",
            ));
        }
        validate_password(new)?;

        let conn = self.db.connect()?;
        let mut exec = store::fetch::<Exec>(&conn, exec_id)?
            .ok_or_else(|| RegistryError::not_found(format!("Exec with id {exec_id} not found")))?;

        if !bcrypt::verify(current, &exec.password)? {
            return Err(RegistryError::unauthorized("current password is incorrect"));
        }

        exec.password = bcrypt::hash(new, bcrypt::DEFAULT_COST)?;
        exec.password_changed_at = Some(Utc::now().to_rfc3339());
        store::update(&conn, &exec)?;

        info!(identity = exec_id, "password updated");
        self.identity_for(&exec)
    }

    /// Issues a reset token for the account registered under `email`.
    pub fn forgot_password(&self, email: &str) -> Result<ResetTicket> {
        let conn = self.db.connect()?;
        let mut exec = find_by(&conn, "email", email)?
            .ok_or_else(|| RegistryError::not_found(format!("no account with email {email}")))?;

        let raw = rand::random::<[u8; RESET_TOKEN_BYTES]>();
        let token = hex::encode(raw);
        let expires_at = Utc::now() + ttl(self.reset_token_ttl)?;

        exec.reset_code = Some(digest(&raw));
        exec.token_expires_at = Some(expires_at.to_rfc3339());
        store::update(&conn, &exec)?;

        info!(identity = exec.id, "password reset token issued");
        Ok(ResetTicket {
            exec_id: exec.id,
            email: exec.email,
            token,
            expires_at,
        })
    }

    /// Sets a new password using a token from [`forgot_password`](Self::forgot_password).
    pub fn reset_password(&self, token: &str, new: &str, confirm: &str) -> Result<()> {
        if new != confirm {
            return Err(RegistryError::invalid_input("passwords do not match"));
        }
        validate_password(new)?;

        let raw = hex::decode(token.trim())
            .map_err(|_| RegistryError::invalid_input("invalid reset token"))?;
        let rejected = || RegistryError::unauthorized("invalid or expired reset token");

        let conn = self.db.connect()?;
        let mut exec = find_by(&conn, "resetCode", &digest(&raw))?.ok_or_else(rejected)?;

        let expires_at = exec
            .token_expires_at
            .as_deref()
            .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
            .map(|stamp| stamp.with_timezone(&Utc))
            .ok_or_else(rejected)?;
        if expires_at <= Utc::now() {
            warn!(identity = exec.id, "expired reset token used");
            return Err(rejected());
        }

        exec.password = bcrypt::hash(new, bcrypt::DEFAULT_COST)?;
        exec.password_changed_at = Some(Utc::now().to_rfc3339());
        exec.reset_code = None;
        exec.token_expires_at = None;
        store::update(&conn, &exec)?;

        info!(identity = exec.id, "password reset");
        Ok(())
    }

    fn identity_for(&self, exec: &Exec) -> Result<Identity> {
        let role = exec.role.parse::<Role>()?;
        Ok(Identity::new(
            exec.id,
            exec.username.clone(),
            role,
            Utc::now() + ttl(self.session_ttl)?,
        ))
    }
}

/// Validates and hashes a new account before it is inserted.
pub(crate) fn prepare_new_exec(exec: &mut Exec) -> Result<()> {
    if exec.username.is_empty() {
        return Err(RegistryError::invalid_input("username cannot be empty"));
    }
    if exec.username.len() > MAX_USERNAME_LEN {
        return Err(RegistryError::invalid_input(format!(
            "username too long (max {MAX_USERNAME_LEN} characters)"
        )));
    }
    let role = exec
        .role
        .parse::<Role>()
        .map_err(|_| RegistryError::invalid_input(format!("unknown role '{}'", exec.role)))?;
    exec.role = role.as_str().to_string();
    validate_password(&exec.password)?;

    exec.password = bcrypt::hash(&exec.password, bcrypt::DEFAULT_COST)?;
    exec.user_created_at = Some(Utc::now().to_rfc3339());
    exec.password_changed_at = None;
    exec.reset_code = None;
    exec.token_expires_at = None;
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(RegistryError::invalid_input("password cannot be empty"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(RegistryError::invalid_input(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

fn digest(raw: &[u8]) -> String {
    hex::encode(Sha256::digest(raw))
}

fn ttl(duration: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|_| RegistryError::invalid_input("token lifetime is out of range"))
}

/// Looks up one exec by the column behind `external`.
fn find_by(conn: &Connection, external: &str, value: &str) -> Result<Option<Exec>> {
    let (_, field) = Exec::field(external)
        .ok_or_else(|| RegistryError::invalid_input(format!("unknown field '{external}'")))?;
    let sql = format!(
        "{} AND {} = ? LIMIT 1",
        generate::<Exec>(StatementKind::SelectAll)?,
        field.storage
    );
    let mut found = store::query::<Exec>(conn, &sql, &[Value::from(value)])?;
    Ok(found.pop())
}
