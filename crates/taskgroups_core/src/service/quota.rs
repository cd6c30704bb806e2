//! Membership-tier quota policy.
//!
//! # Invariants
//! - Premium tier is never limited.
//! - Free tier is allowed while the count is strictly below the ceiling.
//! - Predicates are pure; ceilings are compile-time constants.

/// Free tier ceiling for task groups.
pub const FREE_GROUP_LIMIT: usize = 3;

/// Free tier ceiling for main groups.
pub const FREE_MAIN_GROUP_LIMIT: usize = 1;

/// Membership tier consumed by the quota predicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

impl Tier {
    pub fn from_premium(is_premium: bool) -> Self {
        if is_premium {
            Self::Premium
        } else {
            Self::Free
        }
    }

    pub fn is_premium(self) -> bool {
        self == Self::Premium
    }
}

/// Which quota refused a creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaKind {
    Group,
    MainGroup,
}

/// Returns whether one more group may be created.
pub fn can_add_group(current_count: usize, tier: Tier) -> bool {
    within_limit(current_count, tier, FREE_GROUP_LIMIT)
}

/// Returns whether one more main group may be created.
pub fn can_add_main_group(current_count: usize, tier: Tier) -> bool {
    within_limit(current_count, tier, FREE_MAIN_GROUP_LIMIT)
}

fn within_limit(current_count: usize, tier: Tier, free_limit: usize) -> bool {
    match tier {
        Tier::Premium => true,
        Tier::Free => current_count < free_limit,
    }
}
