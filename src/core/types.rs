use super::{RegistryError, Result, Value};
use std::fmt;

/// Declared storage type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    Boolean,
    /// Text column that may hold NULL.
    OptionalText,
}

impl FieldType {
    /// Column definition used when bootstrapping tables.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER NOT NULL DEFAULT 0",
            Self::Text => "TEXT NOT NULL DEFAULT ''",
            Self::Boolean => "BOOLEAN NOT NULL DEFAULT 0",
            Self::OptionalText => "TEXT",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::OptionalText => "TEXT or NULL",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable, typed view of one record field.
///
/// Slots are the only way values get into a record: rows are scanned into
/// them and patch values are coerced through them. Holding a slot requires a
/// `&mut` borrow of the record, so nothing can be written into a copy.
#[derive(Debug)]
pub enum Slot<'a> {
    Integer(&'a mut i64),
    Text(&'a mut String),
    Boolean(&'a mut bool),
    OptionalText(&'a mut Option<String>),
}

impl Slot<'_> {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Integer(_) => FieldType::Integer,
            Self::Text(_) => FieldType::Text,
            Self::Boolean(_) => FieldType::Boolean,
            Self::OptionalText(_) => FieldType::OptionalText,
        }
    }

    /// Coerces `value` to the slot's type and stores it.
    ///
    /// Integers accept whole floats (JSON has a single number type); nothing
    /// else converts across types. On mismatch the slot is left untouched.
    pub fn assign(&mut self, field: &str, value: &Value) -> Result<()> {
        let mismatch = |expected: FieldType| RegistryError::TypeMismatch {
            field: field.to_string(),
            expected: expected.name(),
            found: value.type_name(),
        };

        match self {
            Self::Integer(target) => {
                **target = value.as_i64().ok_or_else(|| mismatch(FieldType::Integer))?;
            }
            Self::Text(target) => {
                let text = value.as_str().ok_or_else(|| mismatch(FieldType::Text))?;
                **target = text.to_string();
            }
            Self::Boolean(target) => {
                **target = value.as_bool().ok_or_else(|| mismatch(FieldType::Boolean))?;
            }
            Self::OptionalText(target) => match value {
                Value::Null => **target = None,
                Value::Text(text) => **target = Some(text.clone()),
                _ => return Err(mismatch(FieldType::OptionalText)),
            },
        }
        Ok(())
    }

    /// Reads column `index` of a result row into the slot.
    pub fn scan(&mut self, row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<()> {
        match self {
            Self::Integer(target) => **target = row.get(index)?,
            Self::Text(target) => **target = row.get(index)?,
            Self::Boolean(target) => **target = row.get(index)?,
            Self::OptionalText(target) => **target = row.get(index)?,
        }
        Ok(())
    }
}

/// Rust types that can back a record field.
pub trait FieldValue {
    const FIELD_TYPE: FieldType;

    fn to_value(&self) -> Value;
    fn slot(&mut self) -> Slot<'_>;
}

impl FieldValue for i64 {
    const FIELD_TYPE: FieldType = FieldType::Integer;

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Integer(self)
    }
}

impl FieldValue for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Text(self)
    }
}

impl FieldValue for bool {
    const FIELD_TYPE: FieldType = FieldType::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::Boolean(self)
    }
}

impl FieldValue for Option<String> {
    const FIELD_TYPE: FieldType = FieldType::OptionalText;

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }

    fn slot(&mut self) -> Slot<'_> {
        Slot::OptionalText(self)
    }
}
