//! Subscription
//!
//! Plans and expiry dates are not stored yet. Until the migration adding
//! them lands every user gets a placeholder and extending a subscription
//! only reports what would happen.
use async_graphql::{ComplexObject, Enum, SimpleObject};
use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

use crate::{
    auth::signup::ValidationError,
    backend::{Backend, UserProfile},
    profiles::WorkflowError,
    whatsapp::wa_link,
};

mod graphql;

pub use graphql::{SubscriptionMutations, SubscriptionQueries};

pub const DEFAULT_PLAN: &str = "free";
pub const RENEWAL_MESSAGE: &str = "Halo, saya ingin memperpanjang subscription.";

/// A subscription ending within this many days shows a warning
pub const WARNING_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, SimpleObject)]
#[graphql(complex)]
pub struct SubscriptionInfo {
    pub plan: String,
    /// ``None`` means the subscription never ends
    pub subscription_end: Option<DateTime<Utc>>,
    pub last_active: DateTime<Utc>,
    /// Where to ask for a renewal
    pub whatsapp: Option<String>,
}

/// What the banner above the dashboard shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Hidden,
    Expired,
    Warning { days: i64 },
    Active { plan: String, days: i64 },
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Hidden,
    Expired,
    Warning,
    Active,
}

impl Banner {
    pub fn kind(&self) -> BannerKind {
        match self {
            Self::Hidden => BannerKind::Hidden,
            Self::Expired => BannerKind::Expired,
            Self::Warning { .. } => BannerKind::Warning,
            Self::Active { .. } => BannerKind::Active,
        }
    }
}

impl SubscriptionInfo {
    /// Unlimited free plan, active now
    pub fn placeholder(now: DateTime<Utc>, whatsapp: Option<String>) -> Self {
        Self {
            plan: DEFAULT_PLAN.to_string(),
            subscription_end: None,
            last_active: now,
            whatsapp,
        }
    }

    /// Whole days left, rounded up. Negative once expired.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        let millis = (self.subscription_end? - now).num_milliseconds();
        let days = millis / MILLIS_PER_DAY;
        // integer division truncates towards zero, ceil only differs above it
        Some(if millis % MILLIS_PER_DAY > 0 { days + 1 } else { days })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.subscription_end.map_or(false, |end| end <= now)
    }

    pub fn banner(&self, now: DateTime<Utc>) -> Banner {
        let days = match self.days_remaining(now) {
            None => return Banner::Hidden,
            Some(days) => days,
        };
        if self.is_expired(now) {
            Banner::Expired
        } else if days <= WARNING_DAYS {
            Banner::Warning { days }
        } else {
            Banner::Active {
                plan: self.plan.clone(),
                days,
            }
        }
    }

    /// Opens a chat asking for a renewal. ``None`` without a number to ask.
    pub fn renewal_link(&self) -> Option<String> {
        self.whatsapp
            .as_deref()
            .map(|w| wa_link(w, Some(RENEWAL_MESSAGE)))
    }
}

#[ComplexObject]
impl SubscriptionInfo {
    #[graphql(name = "daysRemaining")]
    async fn days_left(&self) -> Option<i64> {
        self.days_remaining(Utc::now())
    }

    #[graphql(name = "isExpired")]
    async fn expired(&self) -> bool {
        self.is_expired(Utc::now())
    }

    #[graphql(name = "banner")]
    async fn banner_kind(&self) -> BannerKind {
        self.banner(Utc::now()).kind()
    }

    #[graphql(name = "renewalLink")]
    async fn link(&self) -> Option<String> {
        self.renewal_link()
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// The profile exists but subscriptions are not stored yet
    PendingSetup,
}

#[derive(Debug, Clone, SimpleObject)]
/// A line of the admin's subscription list
pub struct SubscriptionRow {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

impl From<UserProfile> for SubscriptionRow {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            email: profile.email,
            username: profile.username,
            is_approved: profile.is_approved,
            created_at: profile.created_at,
            status: SubscriptionStatus::PendingSetup,
        }
    }
}

/// Case-insensitive match on email and username
pub fn matches_search(row: &SubscriptionRow, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    row.email.to_lowercase().contains(&term) || row.username.to_lowercase().contains(&term)
}

/// The durations an admin can pick
pub const EXTENSION_MONTHS: [u32; 5] = [1, 2, 3, 6, 12];

/// A checked extension duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Months(u32);

impl Months {
    pub fn new(months: u32) -> Result<Self, ValidationError> {
        if EXTENSION_MONTHS.contains(&months) {
            Ok(Self(months))
        } else {
            Err(ValidationError::InvalidDuration)
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendStatus {
    /// Nothing was written, the subscription tables do not exist yet
    PendingMigration,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct Extension {
    pub user_id: Uuid,
    pub email: String,
    pub months: u32,
    pub status: ExtendStatus,
    /// What the admin is told
    pub messages: Vec<String>,
}

/// Checks the user exists and reports the extension. Writes nothing.
pub async fn extend(
    backend: &dyn Backend,
    user_id: Uuid,
    months: Months,
) -> Result<Extension, WorkflowError> {
    let profile = backend
        .profile(user_id)
        .await?
        .ok_or(WorkflowError::UnknownProfile(user_id))?;
    info!(
        "subscription of {} would be extended by {} months",
        user_id,
        months.get()
    );
    Ok(Extension {
        messages: vec![
            format!(
                "Subscription {} akan diperpanjang {} bulan",
                profile.email,
                months.get()
            ),
            "Fitur subscription akan aktif setelah migration SQL dijalankan".to_string(),
        ],
        user_id,
        email: profile.email,
        months: months.get(),
        status: ExtendStatus::PendingMigration,
    })
}
