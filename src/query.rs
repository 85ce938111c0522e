//! Query Augmenter: appends caller filters and ordering to a listing query.
//!
//! Only allow-listed field names ever reach the SQL text, translated to their
//! storage names; filter values are always bound as arguments.

use crate::core::Value;
use crate::schema::Record;

/// Fields a listing can be filtered on, by external name.
pub const FILTERABLE_FIELDS: &[&str] = &["firstName", "lastName", "email", "class", "subject"];

/// Fields a listing can be ordered by, by external name.
pub const SORTABLE_FIELDS: &[&str] = &["firstName", "lastName", "email", "class", "subject"];

pub const SORT_PARAM: &str = "sortBy";

/// Appends `AND column = ?` for every allow-listed field the caller supplied.
///
/// Fields are visited in allow-list order; the first non-empty value given for
/// a field wins. Empty values, names outside the allow-list and names `R` does
/// not declare are ignored.
pub fn add_filters<R: Record>(query: &str, params: &[(String, String)]) -> (String, Vec<Value>) {
    let mut sql = query.to_string();
    let mut arguments = Vec::new();

    for name in FILTERABLE_FIELDS {
        let Some((_, field)) = R::field(name) else {
            continue;
        };
        if let Some((_, value)) = params
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
        {
            sql.push_str(&format!(" AND {} = ?", field.storage));
            arguments.push(Value::Text(value.clone()));
        }
    }

    (sql, arguments)
}

/// Appends an `ORDER BY` built from every valid `sortBy=field:direction`.
///
/// Direction must be exactly `asc` or `desc`. Invalid entries are skipped;
/// when none are valid the query is returned unchanged.
pub fn add_sorting<R: Record>(query: &str, params: &[(String, String)]) -> String {
    let terms = params
        .iter()
        .filter(|(key, _)| key == SORT_PARAM)
        .filter_map(|(_, value)| sort_term::<R>(value))
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return query.to_string();
    }
    format!("{} ORDER BY {}", query, terms.join(", "))
}

fn sort_term<R: Record>(raw: &str) -> Option<String> {
    let (name, direction) = raw.split_once(':')?;
    if direction != "asc" && direction != "desc" {
        return None;
    }
    if !SORTABLE_FIELDS.contains(&name) {
        return None;
    }
    let (_, field) = R::field(name)?;
    Some(format!("{} {}", field.storage, direction.to_ascii_uppercase()))
}
