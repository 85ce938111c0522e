use super::bulk::{Outcome, apply_bulk};
use super::{Database, delete, fetch, insert, query, update};
use crate::core::{RegistryError, Result};
use crate::gate::{Guarded, Identity};
use crate::models::{Student, Teacher};
use crate::patch::{BulkPatchSet, IdentityRef, Patch, merge};
use crate::query::{add_filters, add_sorting};
use crate::schema::{Access, Record, StatementKind, generate};
use std::marker::PhantomData;
use tracing::{debug, info};

/// CRUD operations for one record kind.
///
/// Reads are open; every mutation checks the caller against the kind's
/// [`AccessPolicy`](crate::gate::AccessPolicy) before touching storage.
pub struct Repository<R> {
    db: Database,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Lists records matching the allow-listed filters in `params`, ordered by any valid `sortBy`.
    pub fn list(&self, params: &[(String, String)]) -> Result<Vec<R>> {
        let base = generate::<R>(StatementKind::SelectAll)?;
        let (sql, arguments) = add_filters::<R>(&base, params);
        let sql = add_sorting::<R>(&sql, params);

        let conn = self.db.connect()?;
        let records = query::<R>(&conn, &sql, &arguments)?;
        debug!(table = %R::table_name(), rows = records.len(), "listed records");
        Ok(records)
    }

    pub fn get(&self, identity: i64) -> Result<R> {
        let conn = self.db.connect()?;
        fetch::<R>(&conn, identity)?.ok_or_else(|| missing::<R>(identity))
    }
}

impl<R: Record + Guarded> Repository<R> {
    /// Inserts every record in one transaction and returns them with their assigned identities.
    pub fn create(&self, caller: &Identity, records: Vec<R>) -> Result<Vec<R>> {
        caller.authorize(R::POLICY.create)?;
        if records.is_empty() {
            return Err(RegistryError::invalid_input("no records to create"));
        }

        let mut prepared = Vec::with_capacity(records.len());
        for mut record in records {
            record.prepare_insert()?;
            prepared.push(record);
        }

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        for record in &mut prepared {
            insert(&tx, record)?;
        }
        tx.commit()?;

        info!(table = %R::table_name(), entries = prepared.len(), "records created");
        Ok(prepared)
    }

    /// Replaces every patchable field of an existing record.
    ///
    /// The identity comes from `identity`, never from the payload, and sealed
    /// fields keep their stored values.
    pub fn replace(&self, caller: &Identity, identity: i64, mut record: R) -> Result<R> {
        caller.authorize(R::POLICY.update)?;

        let conn = self.db.connect()?;
        let existing = fetch::<R>(&conn, identity)?.ok_or_else(|| missing::<R>(identity))?;
        record.set_identity(existing.identity());
        keep_sealed(&existing, &mut record)?;
        update(&conn, &record)?;

        info!(table = %R::table_name(), identity, "record replaced");
        Ok(record)
    }

    /// Read, merge, write the whole row.
    pub fn patch(&self, caller: &Identity, identity: i64, patch: &Patch) -> Result<R> {
        caller.authorize(R::POLICY.update)?;

        let conn = self.db.connect()?;
        let existing = fetch::<R>(&conn, identity)?.ok_or_else(|| missing::<R>(identity))?;
        let merged = merge(&existing, patch)?;
        update(&conn, &merged)?;

        info!(table = %R::table_name(), identity, fields = patch.len(), "record patched");
        Ok(merged)
    }

    /// Applies every entry in one transaction; returns the patched identities in input order.
    pub fn patch_many(&self, caller: &Identity, set: &BulkPatchSet) -> Result<Vec<i64>> {
        caller.authorize(R::POLICY.update)?;

        let table = R::table_name();
        let mut conn = self.db.connect()?;
        let entries = set
            .entries()
            .iter()
            .map(|entry| (&entry.identity, &entry.patch));

        apply_bulk(&mut conn, &table, entries, false, |tx, identity, patch| {
            let existing = fetch::<R>(tx, identity)?.ok_or_else(|| missing::<R>(identity))?;
            let merged = merge(&existing, patch)?;
            update(tx, &merged)?;
            Ok(Outcome::Affected)
        })
    }

    pub fn delete(&self, caller: &Identity, identity: i64) -> Result<()> {
        caller.authorize(R::POLICY.delete)?;

        let conn = self.db.connect()?;
        if delete::<R>(&conn, identity)? == 0 {
            return Err(missing::<R>(identity));
        }

        info!(table = %R::table_name(), identity, "record deleted");
        Ok(())
    }

    /// Deletes in one transaction. Identities with no row are left out of the
    /// result; the call fails only when nothing was deleted at all.
    pub fn delete_many(&self, caller: &Identity, identities: &[IdentityRef]) -> Result<Vec<i64>> {
        caller.authorize(R::POLICY.delete)?;
        if identities.is_empty() {
            return Err(RegistryError::invalid_input("no identities to delete"));
        }

        let table = R::table_name();
        let mut conn = self.db.connect()?;
        let entries = identities.iter().map(|identity| (identity, ()));

        apply_bulk(&mut conn, &table, entries, true, |tx, identity, ()| {
            match delete::<R>(tx, identity)? {
                0 => Ok(Outcome::Untouched),
                _ => Ok(Outcome::Affected),
            }
        })
    }
}

impl Repository<Teacher> {
    /// Students in the class the teacher leads.
    pub fn students_of_teacher(&self, teacher_id: i64) -> Result<Vec<Student>> {
        let class = self.get(teacher_id)?.class;
        let params = [("class".to_string(), class)];
        Repository::<Student>::new(self.db.clone()).list(&params)
    }

    pub fn student_count_of_teacher(&self, teacher_id: i64) -> Result<usize> {
        let class = self.get(teacher_id)?.class;
        let conn = self.db.connect()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE class = ?", Student::table_name()),
            [class],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn missing<R: Record>(identity: i64) -> RegistryError {
    RegistryError::not_found(format!("{} with id {} not found", R::MODEL, identity))
}

/// Copies sealed field values from the stored record into its replacement.
fn keep_sealed<R: Record>(existing: &R, replacement: &mut R) -> Result<()> {
    let stored = existing.values();
    let mut slots = replacement.slots();
    for (index, field) in R::fields().iter().enumerate() {
        if field.access == Access::Sealed {
            slots[index].assign(field.external, &stored[index])?;
        }
    }
    Ok(())
}
