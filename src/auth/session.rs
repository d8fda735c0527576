use async_graphql::SimpleObject;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, SimpleObject, Serialize, Deserialize)]
#[non_exhaustive]
/// Session
///
/// Keeps information about the time frame the client can use a
/// ``TokenPair`` to authenticate
pub struct Session {
    /// The user this session belongs to
    pub user_id: Uuid,
    /// the unique identifier of this session
    pub session_id: Uuid,
    /// whether the user asked to stay logged in
    pub remember_me: bool,
    /// when the access token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, remember_me: bool, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            session_id: Uuid::new_v4(),
            remember_me,
            expires_at: now + Self::lifetime(remember_me),
        }
    }

    /// Remembered sessions outlive a work week of shifts, others a single shift
    pub fn lifetime(remember_me: bool) -> Duration {
        if remember_me {
            Duration::days(30)
        } else {
            Duration::hours(12)
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
