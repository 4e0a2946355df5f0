//! Users as seen by the workflow layer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role carried by the identity token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Manager,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Manager => "manager",
            UserRole::User => "user",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" | "admin" => Ok(UserRole::Manager),
            "user" => Ok(UserRole::User),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The user performing an operation; names are snapshotted into ledger rows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            name: name.into(),
            role,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == UserRole::Manager
    }
}
