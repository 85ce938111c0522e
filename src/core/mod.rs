pub mod error;
pub mod types;
pub mod value;

pub use error::{RegistryError, Result};
pub use types::{FieldType, FieldValue, Slot};
pub use value::Value;
