// src/users/services.rs

use chrono::{DateTime, Months, NaiveTime, Utc};

use super::models::{
    StatusFilter, UpdateUserRequest, UserDto, UserListQuery, UserPageResponse, UserStats,
};
use crate::services::identity::{IdentityProvider, ProfileUpdate, ProviderError, UserRecord};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Start of the same calendar day one month before `now`. Days past the end
/// of the shorter month clamp to its last day.
pub fn month_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    let start_of_day = now
        .date_naive()
        .checked_sub_months(Months::new(1))
        .unwrap_or(now.date_naive())
        .and_time(NaiveTime::MIN);
    DateTime::from_naive_utc_and_offset(start_of_day, Utc)
}

pub fn compute_stats(users: &[UserRecord], now: DateTime<Utc>) -> UserStats {
    let cutoff = month_ago(now);
    let inactive_users = users.iter().filter(|u| u.disabled).count();

    UserStats {
        total_users: users.len(),
        active_users: users.len() - inactive_users,
        inactive_users,
        new_users: users.iter().filter(|u| u.created_at >= cutoff).count(),
    }
}

fn matches_search(user: &UserDto, needle: &str) -> bool {
    let contains = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(needle));
    contains(user.display_name.as_deref())
        || contains(user.email.as_deref())
        || contains(Some(user.uid.as_str()))
}

/// Search across name, email and uid, status filter, then a 1-based page.
pub fn filter_users(users: Vec<UserDto>, query: &UserListQuery) -> UserPageResponse {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();
    let status = query.status.unwrap_or_default();

    let filtered: Vec<UserDto> = users
        .into_iter()
        .filter(|u| needle.is_empty() || matches_search(u, &needle))
        .filter(|u| match status {
            StatusFilter::All => true,
            StatusFilter::Active => !u.disabled,
            StatusFilter::Inactive => u.disabled,
        })
        .collect();

    let page_size = query.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE);
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let total = filtered.len();

    UserPageResponse {
        users: filtered
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect(),
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}

/// Writes profile fields and claims only when present, then re-reads the user.
pub async fn apply_update(
    identity: &dyn IdentityProvider,
    uid: &str,
    update: UpdateUserRequest,
) -> Result<UserRecord, ProviderError> {
    let profile = ProfileUpdate {
        display_name: update.display_name,
        email: update.email,
        disabled: update.disabled,
        ..Default::default()
    };

    if !profile.is_empty() {
        identity.update_user(uid, profile).await?;
    }

    if let Some(claims) = update.custom_claims {
        identity.set_custom_claims(uid, claims).await?;
    }

    identity.get_user(uid).await
}
