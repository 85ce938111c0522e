//! Bulk Transaction Coordinator.
//!
//! Entries run strictly in input order inside one transaction. The first
//! failure drops the transaction, which rolls back every earlier entry.

use crate::core::{RegistryError, Result};
use crate::patch::IdentityRef;
use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

/// What a single entry did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    Affected,
    /// No row matched; left out of the result instead of failing.
    Untouched,
}

/// Runs `apply` for each `(identity, payload)` pair and commits once.
///
/// Returns the identities whose entry reported [`Outcome::Affected`]. When
/// `require_effect` is set and no entry affected anything, the batch fails
/// with `NotFound` and nothing is committed.
pub(super) fn apply_bulk<'e, T, F>(
    conn: &mut Connection,
    table: &str,
    entries: impl IntoIterator<Item = (&'e IdentityRef, T)>,
    require_effect: bool,
    mut apply: F,
) -> Result<Vec<i64>>
where
    F: FnMut(&Transaction<'_>, i64, T) -> Result<Outcome>,
{
    let tx = conn.transaction()?;
    let mut affected = Vec::new();
    let mut position = 0usize;

    for (identity_ref, payload) in entries {
        position += 1;

        let identity = identity_ref
            .resolve()
            .map_err(|err| rolled_back(table, position, None, err))?;

        match apply(&tx, identity, payload) {
            Ok(Outcome::Affected) => affected.push(identity),
            Ok(Outcome::Untouched) => {
                debug!(table, identity, "bulk entry matched no row");
            }
            Err(err) => return Err(rolled_back(table, position, Some(identity), err)),
        }
    }

    if require_effect && affected.is_empty() {
        warn!(table, entries = position, "bulk operation affected no rows");
        return Err(RegistryError::not_found(format!(
            "none of the {position} requested records exist in {table}"
        )));
    }

    tx.commit()?;
    info!(table, entries = position, affected = affected.len(), "bulk operation committed");
    Ok(affected)
}

fn rolled_back(
    table: &str,
    position: usize,
    identity: Option<i64>,
    err: RegistryError,
) -> RegistryError {
    warn!(
        table,
        entry = position,
        identity = ?identity,
        error = %err,
        "bulk operation rolled back"
    );
    RegistryError::aborted(identity, err)
}
