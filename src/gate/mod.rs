//! Identity Gate: the verified caller identity consumed by the core.
//!
//! Token signing and cookie handling live in front of the registry. What
//! reaches the core is an [`Identity`] value that is passed explicitly into
//! every mutating operation and checked before any storage work happens.

mod limiter;

pub use limiter::RateLimiter;

use crate::core::{RegistryError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Permission label of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    Exec,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Exec => "exec",
        }
    }
}

impl FromStr for Role {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "exec" => Ok(Self::Exec),
            other => Err(RegistryError::unauthorized(format!("unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles allowed to run each kind of mutation on a record kind.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    pub create: &'static [Role],
    pub update: &'static [Role],
    pub delete: &'static [Role],
}

/// A record kind whose mutations are role-gated.
pub trait Guarded {
    const POLICY: AccessPolicy;

    /// Runs on every record before it is inserted through a repository.
    fn prepare_insert(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Verified, request-scoped caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(
        user_id: i64,
        username: impl Into<String>,
        role: Role,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Fails with `Unauthorized` unless the identity is live and its role is in `allowed`.
    pub fn authorize(&self, allowed: &[Role]) -> Result<()> {
        if self.is_expired() {
            return Err(RegistryError::unauthorized("session expired"));
        }
        if !allowed.contains(&self.role) {
            return Err(RegistryError::unauthorized(format!(
                "role '{}' is not allowed to perform this action",
                self.role
            )));
        }
        Ok(())
    }
}
