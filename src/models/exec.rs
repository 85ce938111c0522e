use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::gate::{AccessPolicy, Guarded, Role};

crate::record! {
    /// A staff account ("exec") that can sign in and manage the registry.
    ///
    /// Credential columns are `Sealed`: patches cannot reach them and they are
    /// never serialized back out. `password` is still accepted on input so new
    /// accounts can be created from a payload.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Exec {
        id => "id" / "id",
        [Patchable] first_name: String => "firstName" / "firstName",
        [Patchable] last_name: String => "lastName" / "lastName",
        [Patchable] email: String => "email" / "email",
        [Patchable] username: String => "username" / "username",
        #[serde(skip_serializing)]
        [Sealed] password: String => "password" / "password",
        [Sealed] password_changed_at: Option<String> => "passwordChangedAt" / "passwordChangedAt",
        [Sealed] user_created_at: Option<String> => "userCreatedAt" / "userCreatedAt",
        #[serde(skip)]
        [Sealed] token_expires_at: Option<String> => "tokenExpiresAt" / "tokenExpiresAt",
        #[serde(skip)]
        [Sealed] reset_code: Option<String> => "resetCode" / "passwordResetToken",
        [Patchable] inactive_status: bool => "inactiveStatus" / "inactiveStatus",
        [Patchable] role: String => "role" / "role",
    }
}

impl Guarded for Exec {
    const POLICY: AccessPolicy = AccessPolicy {
        create: &[Role::Admin],
        update: &[Role::Admin],
        delete: &[Role::Admin],
    };

    fn prepare_insert(&mut self) -> Result<()> {
        crate::accounts::prepare_new_exec(self)
    }
}
