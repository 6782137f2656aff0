//! Badge grouping and streak lookup for display.

use std::collections::BTreeMap;

use crate::types::{Badge, BadgeRarity, Streak};

/// Group badges into rarity buckets.
///
/// Every rarity is present in the result, empty when the user holds none of it.
/// Badges keep their original relative order inside a bucket.
pub fn group_badges_by_rarity(badges: &[Badge]) -> BTreeMap<BadgeRarity, Vec<Badge>> {
    let mut groups: BTreeMap<BadgeRarity, Vec<Badge>> = BadgeRarity::all()
        .into_iter()
        .map(|rarity| (rarity, Vec::new()))
        .collect();

    for badge in badges {
        groups.entry(badge.rarity).or_default().push(badge.clone());
    }

    groups
}

/// The `n` most recently earned badges, newest first.
///
/// Badges without an `earned_at` are skipped. Ties keep input order.
pub fn latest_badges(badges: &[Badge], n: usize) -> Vec<Badge> {
    let mut earned: Vec<&Badge> = badges.iter().filter(|b| b.is_earned()).collect();
    earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at));
    earned.into_iter().take(n).cloned().collect()
}

/// Find a streak by its type.
pub fn find_streak<'a>(streaks: &'a [Streak], streak_type: &str) -> Option<&'a Streak> {
    streaks.iter().find(|s| s.streak_type == streak_type)
}
