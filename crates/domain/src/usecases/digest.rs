//! Digest selection - decides what, if anything, a subscriber receives

use crate::model::{NewsItem, Preferences, SkipReason};

/// Outcome of selecting a digest for one subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestSelection<'a> {
    /// Items to send, in the order they were given
    Send(Vec<&'a NewsItem>),
    /// Nothing to send
    Skip(SkipReason),
}

impl DigestSelection<'_> {
    pub fn is_skip(&self) -> bool {
        matches!(self, DigestSelection::Skip(_))
    }
}

/// Select the period items a subscriber should receive.
///
/// Both skip reasons mean "do not send"; they are kept apart only for logs
/// and per-subscriber outcomes.
pub fn select_for<'a>(all_items: &'a [NewsItem], preferences: &Preferences) -> DigestSelection<'a> {
    let enabled = preferences.enabled();
    if enabled.is_empty() {
        return DigestSelection::Skip(SkipReason::NoCategoriesSelected);
    }

    let selected: Vec<&NewsItem> = all_items
        .iter()
        .filter(|item| enabled.contains(&item.category))
        .collect();

    if selected.is_empty() {
        return DigestSelection::Skip(SkipReason::NoMatchingItems);
    }

    DigestSelection::Send(selected)
}
