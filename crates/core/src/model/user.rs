use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

/// Role carried by every user reference. Authentication itself is handled by
/// the external platform; services only gate on the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Guardian,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Guardian => "guardian",
        }
    }

    /// Roles allowed to author plans and schedule class sessions.
    #[must_use]
    pub fn can_author(&self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Lightweight reference to a user, passed into services as explicit context
/// instead of ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

impl UserRef {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoring_roles() {
        assert!(Role::Admin.can_author());
        assert!(Role::Teacher.can_author());
        assert!(!Role::Student.can_author());
        assert!(!Role::Guardian.can_author());
    }
}
