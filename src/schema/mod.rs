//! Static schema descriptors for persisted records.
//!
//! Every record kind declares its ordered field list exactly once through
//! [`record!`](crate::record). The statement generator, the marshaller and
//! the patch merger all walk that same list, which is what keeps column
//! order, argument order and scan order in lockstep.

mod macros;
pub mod marshal;
pub mod statement;

pub use statement::{StatementKind, generate, table_name};

use crate::core::{FieldType, Slot, Value};

/// How a field may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Row key. First in declared order, never changed by a patch.
    Identity,
    /// Ordinary data; patches may set it.
    Patchable,
    /// Persisted but only written by dedicated flows (password hashes, reset tokens).
    Sealed,
}

/// One persisted field: wire name, column name, access and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub external: &'static str,
    pub storage: &'static str,
    pub access: Access,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub const fn new(
        external: &'static str,
        storage: &'static str,
        access: Access,
        field_type: FieldType,
    ) -> Self {
        Self {
            external,
            storage,
            access,
            field_type,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.access == Access::Identity
    }

    pub fn is_patchable(&self) -> bool {
        self.access == Access::Patchable
    }
}

/// A record kind with a statically declared field table.
///
/// Implemented by [`record!`](crate::record); hand-written impls must keep
/// `fields`, `values` and `slots` in the same order.
pub trait Record: Clone + Default + Send + 'static {
    /// Model name the table name is derived from.
    const MODEL: &'static str;

    fn fields() -> &'static [FieldDescriptor];

    /// One value per declared field, in declared order.
    fn values(&self) -> Vec<Value>;

    /// One writable slot per declared field, in declared order.
    fn slots(&mut self) -> Vec<Slot<'_>>;

    fn identity(&self) -> i64;

    fn set_identity(&mut self, identity: i64);

    fn table_name() -> String {
        table_name(Self::MODEL)
    }

    fn field(external: &str) -> Option<(usize, &'static FieldDescriptor)> {
        Self::fields()
            .iter()
            .enumerate()
            .find(|(_, field)| field.external == external)
    }

    fn identity_field() -> Option<&'static FieldDescriptor> {
        Self::fields().iter().find(|field| field.is_identity())
    }
}
