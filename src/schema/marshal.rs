//! Record Marshaller: records to statement arguments and rows back to records.
//!
//! Both directions iterate the record's declared field table, so the
//! argument and scan order always match what [`generate`](super::generate)
//! emitted for the same kind.

use super::Record;
use crate::core::{Slot, Value};

/// Write mode: one value per field in declared order, optionally without the identity.
pub fn write_values<R: Record>(record: &R, include_identity: bool) -> Vec<Value> {
    R::fields()
        .iter()
        .zip(record.values())
        .filter(|(field, _)| include_identity || !field.is_identity())
        .map(|(_, value)| value)
        .collect()
}

/// Arguments for the generated `INSERT`.
///
/// An identity that was never assigned (zero or negative) is bound as NULL so
/// the store allocates the key.
pub fn insert_arguments<R: Record>(record: &R) -> Vec<Value> {
    R::fields()
        .iter()
        .zip(record.values())
        .map(|(field, value)| match value {
            Value::Integer(id) if field.is_identity() && id <= 0 => Value::Null,
            other => other,
        })
        .collect()
}

/// Arguments for the generated `UPDATE`: every non-identity value in declared
/// order followed by the identity exactly once for the `WHERE` clause.
pub fn update_arguments<R: Record>(record: &R) -> Vec<Value> {
    let mut arguments = write_values(record, false);
    arguments.push(Value::Integer(record.identity()));
    arguments
}

/// Read mode: one writable slot per field in declared order.
///
/// Taking `&mut R` is what makes the slots land in the caller's record.
pub fn read_slots<R: Record>(record: &mut R) -> Vec<Slot<'_>> {
    record.slots()
}

/// Scans a row produced by a generated `SELECT` into a fresh record.
pub fn scan_row<R: Record>(row: &rusqlite::Row<'_>) -> rusqlite::Result<R> {
    let mut record = R::default();
    for (index, mut slot) in read_slots(&mut record).into_iter().enumerate() {
        slot.scan(row, index)?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Student;

    fn student() -> Student {
        Student {
            id: 7,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@school.test".into(),
            class: "5A".into(),
        }
    }

    #[test]
    fn test_write_values_follow_declared_order() {
        let values = write_values(&student(), true);
        assert_eq!(
            values,
            vec![
                Value::Integer(7),
                Value::Text("Ada".into()),
                Value::Text("Lovelace".into()),
                Value::Text("ada@school.test".into()),
                Value::Text("5A".into()),
            ]
        );
        assert_eq!(write_values(&student(), false).len(), 4);
    }

    #[test]
    fn test_update_arguments_append_identity_once() {
        let arguments = update_arguments(&student());
        assert_eq!(arguments.len(), 5);
        assert_eq!(arguments.last(), Some(&Value::Integer(7)));
        assert_eq!(
            arguments
                .iter()
                .filter(|value| **value == Value::Integer(7))
                .count(),
            1
        );
    }

    #[test]
    fn test_insert_arguments_leave_new_identity_unbound() {
        let mut fresh = student();
        fresh.id = 0;
        assert_eq!(insert_arguments(&fresh)[0], Value::Null);
        assert_eq!(insert_arguments(&student())[0], Value::Integer(7));
    }

    #[test]
    fn test_read_slots_write_through() {
        let mut record = Student::default();
        let mut slots = read_slots(&mut record);
        assert_eq!(slots.len(), Student::fields().len());
        slots[4].assign("class", &Value::Text("6C".into())).unwrap();
        drop(slots);
        assert_eq!(record.class, "6C");
    }
}
