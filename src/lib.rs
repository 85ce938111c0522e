// ============================================================================
// School Registry Library
// ============================================================================

pub mod accounts;
pub mod config;
pub mod core;
pub mod gate;
pub mod models;
pub mod patch;
pub mod query;
pub mod schema;
pub mod store;
pub mod web;

// Re-export main types for convenience
pub use accounts::{Accounts, ResetTicket};
pub use config::RegistryConfig;
pub use crate::core::{FieldType, RegistryError, Result, Value};
pub use gate::{AccessPolicy, Guarded, Identity, RateLimiter, Role};
pub use models::{Exec, Student, Teacher};
pub use patch::{BulkPatchSet, IdentityRef, Patch, merge};
pub use schema::{Access, FieldDescriptor, Record, StatementKind, generate};
pub use store::{Database, Repository};

// ============================================================================
// Registry facade
// ============================================================================

/// Entry point bundling the database handle with the account flows.
///
/// # Examples
///
/// ```no_run
/// use school_registry::{Registry, RegistryConfig, Student};
///
/// # fn main() -> school_registry::Result<()> {
/// let registry = Registry::open(RegistryConfig::new("school.db"))?;
/// let students = registry.repository::<Student>().list(&[])?;
/// println!("{} students", students.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    config: RegistryConfig,
    db: Database,
}

impl Registry {
    /// Validates the configuration and makes sure every table exists.
    pub fn open(config: RegistryConfig) -> Result<Self> {
        let db = Database::from_config(&config)?;
        db.init_schema()?;
        Ok(Self { config, db })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn repository<R: Record>(&self) -> Repository<R> {
        self.db.repository()
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.db.clone(), &self.config)
    }

    /// A limiter sized from the configuration; call [`RateLimiter::start`] inside a runtime.
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.config.rate_limit, self.config.rate_window)
    }
}
