use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SharedError;

// User identity = opaque id handed to us by the authentication collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SharedError::InvalidUserId(s.to_string()))
    }
}

/// What the core knows about a user: who they are and how old the account is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub account_created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(user_id: UserId, account_created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            account_created_at,
        }
    }

    /// Whole days between account creation and `now`, clamped at zero for
    /// accounts that claim to be created in the future.
    pub fn account_age_days(&self, now: DateTime<Utc>) -> u64 {
        (now - self.account_created_at).num_days().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_user_id_parse_round_trip() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_user_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn test_account_age_days() {
        let now = Utc::now();
        let identity = Identity::new(UserId::new(), now - Duration::hours(24 * 10 + 5));
        assert_eq!(identity.account_age_days(now), 10);

        let future = Identity::new(UserId::new(), now + Duration::days(3));
        assert_eq!(future.account_age_days(now), 0);
    }
}
