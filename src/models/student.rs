use serde::{Deserialize, Serialize};

use crate::gate::{AccessPolicy, Guarded, Role};

crate::record! {
    /// A student enrolled in a class.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Student {
        id => "id" / "id",
        [Patchable] first_name: String => "firstName" / "firstName",
        [Patchable] last_name: String => "lastName" / "lastName",
        [Patchable] email: String => "email" / "email",
        [Patchable] class: String => "class" / "class",
    }
}

impl Guarded for Student {
    const POLICY: AccessPolicy = AccessPolicy {
        create: &[Role::Admin, Role::Manager],
        update: &[Role::Admin, Role::Manager],
        delete: &[Role::Admin, Role::Manager],
    };
}
