//! Catalog entries ("drops") visible to active members.
//!
//! Entries are created by external curation and never mutate here. Display
//! ordering is `created_at` descending; the "new" and "expiring" badges are
//! derived at read time.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogEntryId(String);

impl CatalogEntryId {
    /// Wrap an externally issued id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl AsRef<str> for CatalogEntryId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// A time-bound offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Stable id.
    pub id: CatalogEntryId,
    /// Headline.
    pub title: String,
    /// Human-readable location, e.g. `Kyoto, JP`.
    pub location: String,
    /// Offer category, e.g. `Hotel Stay`.
    pub category: String,
    /// Short description.
    pub description: String,
    /// Curator-set "new drop" flag.
    pub is_new: bool,
    /// When the offer lapses, if it does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Booking link.
    pub external_link: String,
    /// Ordering key.
    pub created_at: DateTime<Utc>,
}

/// Badge shown on a catalog card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayBadge {
    /// Curated as a new drop.
    New,
    /// Lapses within the display window.
    Expiring,
}

/// Display rules for catalog cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogDisplayPolicy {
    /// Entries lapsing within this window are flagged as expiring.
    pub expiring_window: Duration,
}

impl Default for CatalogDisplayPolicy {
    fn default() -> Self {
        Self {
            expiring_window: Duration::hours(72),
        }
    }
}

impl CatalogDisplayPolicy {
    /// Whether `entry` lapses within the expiring window of `now`.
    pub fn is_expiring(&self, entry: &CatalogEntry, now: DateTime<Utc>) -> bool {
        entry
            .expires_at
            .is_some_and(|expires_at| expires_at - now < self.expiring_window)
    }

    /// Badge for `entry`; the curated "new" flag wins over expiry.
    pub fn badge(&self, entry: &CatalogEntry, now: DateTime<Utc>) -> Option<DisplayBadge> {
        if entry.is_new {
            Some(DisplayBadge::New)
        } else if self.is_expiring(entry, now) {
            Some(DisplayBadge::Expiring)
        } else {
            None
        }
    }
}

/// Portal filter chip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogFilter {
    /// No filtering.
    #[default]
    All,
    /// Keep entries whose category or location contains the text.
    Matching(String),
}

impl CatalogFilter {
    /// Parse a filter chip label; `All` disables filtering.
    pub fn from_label(label: &str) -> Self {
        if label == "All" {
            Self::All
        } else {
            Self::Matching(label.to_owned())
        }
    }

    /// Whether `entry` passes this filter.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        match self {
            Self::All => true,
            Self::Matching(needle) => {
                entry.category.contains(needle.as_str()) || entry.location.contains(needle.as_str())
            }
        }
    }

    /// Entries passing the filter, in their existing order.
    pub fn apply<'a>(&self, entries: &'a [CatalogEntry]) -> Vec<&'a CatalogEntry> {
        entries.iter().filter(|entry| self.matches(entry)).collect()
    }
}

/// Display order: newest first, ties broken by id for stability.
pub fn display_order(left: &CatalogEntry, right: &CatalogEntry) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| left.id.cmp(&right.id))
}

/// Insert `entry` keeping display order; an entry with a known id is ignored.
///
/// Returns `true` when the entry was inserted.
pub fn insert_ordered(entries: &mut Vec<CatalogEntry>, entry: CatalogEntry) -> bool {
    if entries.iter().any(|existing| existing.id == entry.id) {
        return false;
    }
    let position = entries
        .binary_search_by(|probe| display_order(probe, &entry))
        .unwrap_or_else(|position| position);
    entries.insert(position, entry);
    true
}

/// Starter drops written once when the catalog is first observed empty.
pub fn starter_drops(now: DateTime<Utc>) -> Vec<CatalogEntry> {
    let drop = |id: &str, title: &str, location: &str, category: &str, description: &str, is_new| {
        CatalogEntry {
            id: CatalogEntryId::new(id),
            title: title.to_owned(),
            location: location.to_owned(),
            category: category.to_owned(),
            description: description.to_owned(),
            is_new,
            expires_at: None,
            external_link: "#".to_owned(),
            created_at: now,
        }
    };
    vec![
        drop(
            "1",
            "Tulum Beachfront",
            "Tulum, MX",
            "Hotel Stay",
            "5-night eco-resort opening. Plunge pool included.",
            true,
        ),
        drop(
            "2",
            "Kyoto Machiya",
            "Kyoto, JP",
            "Getaway Drop",
            "Restored traditional townhouse. 3 weeks in April.",
            true,
        ),
        drop(
            "3",
            "Napa Estate",
            "Calistoga, CA",
            "Partner Offer",
            "Vineyard suite. Taxes only.",
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn entry(id: &str, created_hour: u32) -> CatalogEntry {
        CatalogEntry {
            id: CatalogEntryId::new(id),
            title: format!("Drop {id}"),
            location: "Lisbon, PT".to_owned(),
            category: "Hotel Stay".to_owned(),
            description: "Riverside suite.".to_owned(),
            is_new: false,
            expires_at: None,
            external_link: "#".to_owned(),
            created_at: at(created_hour),
        }
    }

    #[fixture]
    fn policy() -> CatalogDisplayPolicy {
        CatalogDisplayPolicy::default()
    }

    #[rstest]
    fn insert_ordered_keeps_newest_first_and_skips_duplicates() {
        let mut entries = Vec::new();
        assert!(insert_ordered(&mut entries, entry("a", 1)));
        assert!(insert_ordered(&mut entries, entry("c", 3)));
        assert!(insert_ordered(&mut entries, entry("b", 2)));
        assert!(!insert_ordered(&mut entries, entry("b", 2)));

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_ref()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[rstest]
    #[case(Some(Duration::hours(71)), Some(DisplayBadge::Expiring))]
    #[case(Some(Duration::hours(73)), None)]
    #[case(None, None)]
    fn expiry_badge_uses_window(
        policy: CatalogDisplayPolicy,
        #[case] lapse_in: Option<Duration>,
        #[case] expected: Option<DisplayBadge>,
    ) {
        let now = at(0);
        let mut drop = entry("x", 0);
        drop.expires_at = lapse_in.map(|delta| now + delta);
        assert_eq!(policy.badge(&drop, now), expected);
    }

    #[rstest]
    fn new_badge_wins_over_expiry(policy: CatalogDisplayPolicy) {
        let now = at(0);
        let mut drop = entry("x", 0);
        drop.is_new = true;
        drop.expires_at = Some(now + Duration::hours(1));
        assert_eq!(policy.badge(&drop, now), Some(DisplayBadge::New));
    }

    #[rstest]
    #[case("All", 3)]
    #[case("Hotel", 1)]
    #[case("Getaway", 1)]
    #[case("CA", 1)]
    #[case("Cruise", 0)]
    fn filter_matches_category_or_location(#[case] label: &str, #[case] expected: usize) {
        let drops = starter_drops(at(0));
        assert_eq!(CatalogFilter::from_label(label).apply(&drops).len(), expected);
    }
}
