//! Fixtures shared by the store's unit tests.

use chrono::{Duration, Utc};
use uuid::Uuid;

use dropspot_shared::{Identity, UserId};

use crate::codec::normalize;
use crate::models::Drop;

/// An identity whose account is `age_days` old.
pub fn identity(age_days: i64) -> Identity {
    Identity::new(UserId::new(), normalize(Utc::now() - Duration::days(age_days)))
}

/// A drop whose window opened an hour ago and closes in an hour.
pub fn open_drop(stock: i64) -> Drop {
    let now = normalize(Utc::now());
    Drop {
        id: Uuid::new_v4(),
        title: "Limited sneakers".to_string(),
        description: Some("Numbered pairs".to_string()),
        stock,
        claim_window_start: now - Duration::hours(1),
        claim_window_end: now + Duration::hours(1),
        created_at: now,
    }
}
