use serde::{Deserialize, Serialize};

use crate::gate::{AccessPolicy, Guarded, Role};

crate::record! {
    /// A teacher; `class` links the teacher to the students they lead.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Teacher {
        id => "id" / "id",
        [Patchable] first_name: String => "firstName" / "firstName",
        [Patchable] last_name: String => "lastName" / "lastName",
        [Patchable] email: String => "email" / "email",
        [Patchable] class: String => "class" / "class",
        [Patchable] subject: String => "subject" / "subject",
    }
}

// Hiring is admin-only; day-to-day edits are shared with managers.
impl Guarded for Teacher {
    const POLICY: AccessPolicy = AccessPolicy {
        create: &[Role::Admin],
        update: &[Role::Admin, Role::Manager],
        delete: &[Role::Admin, Role::Manager],
    };
}
