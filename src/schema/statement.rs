//! Statement Generator: schema descriptor in, parameterized SQL text out.
//!
//! Pure text construction with positional `?` placeholders. Values are never
//! spliced into the text.

use super::{FieldDescriptor, Record};
use crate::core::{RegistryError, Result};
use std::fmt;
use std::str::FromStr;

/// Model names whose table name does not follow the lowercase-plus-`s` rule.
const IRREGULAR_TABLES: &[(&str, &str)] = &[("execdto", "execs")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    /// Single row by identity.
    Select,
    /// Every row; base for filtered listing (`WHERE 1=1`).
    SelectAll,
}

impl FromStr for StatementKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "select" => Ok(Self::Select),
            "select_all" | "list" => Ok(Self::SelectAll),
            other => Err(RegistryError::invalid_input(format!(
                "unknown statement kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Select => "select",
            Self::SelectAll => "select_all",
        };
        f.write_str(name)
    }
}

/// Table name for a model: lowercased and pluralized with a trailing `s`.
pub fn table_name(model: &str) -> String {
    let lower = model.to_ascii_lowercase();
    IRREGULAR_TABLES
        .iter()
        .find(|(irregular, _)| *irregular == lower)
        .map(|(_, table)| (*table).to_string())
        .unwrap_or_else(|| format!("{lower}s"))
}

pub fn generate<R: Record>(kind: StatementKind) -> Result<String> {
    generate_for(R::MODEL, R::fields(), kind)
}

/// Builds the statement for an explicit field table.
///
/// Fails when the table is empty or has no identity field; an empty
/// statement is never handed to the store.
pub fn generate_for(
    model: &str,
    fields: &[FieldDescriptor],
    kind: StatementKind,
) -> Result<String> {
    let identity = identity_column(model, fields)?;
    let table = table_name(model);
    let columns = fields
        .iter()
        .map(|field| field.storage)
        .collect::<Vec<_>>()
        .join(", ");

    let sql = match kind {
        StatementKind::Insert => {
            let placeholders = vec!["?"; fields.len()].join(", ");
            format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
        }
        StatementKind::Update => {
            let assignments = fields
                .iter()
                .filter(|field| !field.is_identity())
                .map(|field| format!("{} = ?", field.storage))
                .collect::<Vec<_>>();
            if assignments.is_empty() {
                return Err(RegistryError::invalid_input(format!(
                    "record '{model}' has no updatable fields"
                )));
            }
            format!(
                "UPDATE {table} SET {} WHERE {identity} = ?",
                assignments.join(", ")
            )
        }
        StatementKind::Delete => format!("DELETE FROM {table} WHERE {identity} = ?"),
        StatementKind::Select => format!("SELECT {columns} FROM {table} WHERE {identity} = ?"),
        StatementKind::SelectAll => format!("SELECT {columns} FROM {table} WHERE 1=1"),
    };

    Ok(sql)
}

/// `CREATE TABLE IF NOT EXISTS` for a record kind, columns in declared order.
pub fn create_table<R: Record>() -> Result<String> {
    let fields = R::fields();
    identity_column(R::MODEL, fields)?;

    let columns = fields
        .iter()
        .map(|field| {
            if field.is_identity() {
                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", field.storage)
            } else {
                format!("{} {}", field.storage, field.field_type.sql_type())
            }
        })
        .collect::<Vec<_>>();

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        R::table_name(),
        columns.join(", ")
    ))
}

/// `CREATE UNIQUE INDEX IF NOT EXISTS` over the column behind `external`.
pub fn create_unique_index<R: Record>(external: &str) -> Result<String> {
    let (_, field) = R::field(external).ok_or_else(|| {
        RegistryError::invalid_input(format!("record '{}' has no field '{external}'", R::MODEL))
    })?;
    let table = R::table_name();
    Ok(format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {table}_{column}_unique ON {table} ({column})",
        column = field.storage
    ))
}

fn identity_column<'a>(model: &str, fields: &'a [FieldDescriptor]) -> Result<&'a str> {
    if fields.is_empty() {
        return Err(RegistryError::invalid_input(format!(
            "record '{model}' declares no persistent fields"
        )));
    }

    fields
        .iter()
        .find(|field| field.is_identity())
        .map(|field| field.storage)
        .ok_or_else(|| {
            RegistryError::invalid_input(format!("record '{model}' declares no identity field"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldType;
    use crate::schema::Access;

    const PEOPLE: &[FieldDescriptor] = &[
        FieldDescriptor::new("id", "id", Access::Identity, FieldType::Integer),
        FieldDescriptor::new("firstName", "first_name", Access::Patchable, FieldType::Text),
        FieldDescriptor::new("email", "email", Access::Patchable, FieldType::Text),
    ];

    #[test]
    fn test_table_names() {
        assert_eq!(table_name("Student"), "students");
        assert_eq!(table_name("Teacher"), "teachers");
        assert_eq!(table_name("Exec"), "execs");
        assert_eq!(table_name("ExecDto"), "execs");
    }

    #[test]
    fn test_insert_lists_every_column() {
        let sql = generate_for("Person", PEOPLE, StatementKind::Insert).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO persons (id, first_name, email) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_update_skips_identity_in_set_clause() {
        let sql = generate_for("Person", PEOPLE, StatementKind::Update).unwrap();
        assert_eq!(
            sql,
            "UPDATE persons SET first_name = ?, email = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_delete_and_select() {
        assert_eq!(
            generate_for("Person", PEOPLE, StatementKind::Delete).unwrap(),
            "DELETE FROM persons WHERE id = ?"
        );
        assert_eq!(
            generate_for("Person", PEOPLE, StatementKind::Select).unwrap(),
            "SELECT id, first_name, email FROM persons WHERE id = ?"
        );
        assert_eq!(
            generate_for("Person", PEOPLE, StatementKind::SelectAll).unwrap(),
            "SELECT id, first_name, email FROM persons WHERE 1=1"
        );
    }

    #[test]
    fn test_empty_schema_is_rejected() {
        for kind in [
            StatementKind::Insert,
            StatementKind::Update,
            StatementKind::Delete,
            StatementKind::Select,
        ] {
            let err = generate_for("Ghost", &[], kind).unwrap_err();
            assert_eq!(err.kind(), "invalid_input");
        }
    }

    #[test]
    fn test_identity_only_schema_cannot_update() {
        let only_id = &PEOPLE[..1];
        assert!(generate_for("Person", only_id, StatementKind::Update).is_err());
        assert!(generate_for("Person", only_id, StatementKind::Delete).is_ok());
    }

    #[test]
    fn test_unique_index_uses_storage_name() {
        use crate::models::Exec;

        assert_eq!(
            create_unique_index::<Exec>("username").unwrap(),
            "CREATE UNIQUE INDEX IF NOT EXISTS execs_username_unique ON execs (username)"
        );
        assert!(create_unique_index::<Exec>("nickname").is_err());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("INSERT".parse::<StatementKind>().unwrap(), StatementKind::Insert);
        assert_eq!("select".parse::<StatementKind>().unwrap(), StatementKind::Select);
        assert!("merge".parse::<StatementKind>().is_err());
    }
}
