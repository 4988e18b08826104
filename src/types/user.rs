//! `User` and `Role`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Operator,
    Supervisor,
    Admin,
}

impl Role {
    /// Whether this role satisfies a `minimum` role requirement, under the
    /// ordering `operator < supervisor < admin`.
    pub fn at_least(self, minimum: Role) -> bool {
        self >= minimum
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
    pub created_ts: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_satisfies_at_least() {
        assert!(Role::Admin.at_least(Role::Operator));
        assert!(Role::Supervisor.at_least(Role::Supervisor));
        assert!(!Role::Operator.at_least(Role::Supervisor));
    }
}
