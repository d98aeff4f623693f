use std::cmp::Reverse;

use crate::{types::FeedItem, watermark::SourceWatermark};

/// The result of asking a source for its latest items
#[derive(Clone, Debug)]
pub enum Fetch {
    /// The source reported nothing changed since the presented change token
    Unchanged,
    Items {
        /// Newest first
        items: Vec<FeedItem>,
        change_token: Option<String>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub struct Delta {
    /// Items that weren't in the previous snapshot, oldest first
    pub new_items: Vec<FeedItem>,
    pub watermark: SourceWatermark,
}

impl Delta {
    fn nothing_new(previous: &SourceWatermark) -> Self {
        Self {
            new_items: Vec::new(),
            watermark: previous.clone(),
        }
    }
}

/// Works out which freshly fetched items are new since `previous`
///
/// `fetch` is `None` when fetching the source failed. Any fetch with items replaces the stored
/// snapshot wholesale, but a source that has never been seen before only gets its snapshot
/// recorded so that the first run doesn't flood destinations with the whole backlog
pub fn compute_delta(source: &str, previous: &SourceWatermark, fetch: Option<Fetch>) -> Delta {
    let (items, change_token) = match fetch {
        None => return Delta::nothing_new(previous),
        Some(Fetch::Unchanged) => {
            tracing::debug!(source, "Source unchanged since last run");
            return Delta::nothing_new(previous);
        }
        Some(Fetch::Items { items, .. }) if items.is_empty() => {
            tracing::info!(source, "Source returned no items, keeping previous snapshot");
            return Delta::nothing_new(previous);
        }
        Some(Fetch::Items {
            items,
            change_token,
        }) => (items, change_token),
    };

    let watermark = SourceWatermark {
        recent_ids: items.iter().map(|item| item.id.clone()).collect(),
        change_token,
    };

    if previous.is_cold() {
        tracing::info!(
            source,
            num_items = items.len(),
            "First time seeing source, recording snapshot without posting"
        );
        return Delta {
            new_items: Vec::new(),
            watermark,
        };
    }

    let mut new_items: Vec<_> = items
        .into_iter()
        .filter(|item| !previous.has_seen(&item.id))
        .collect();
    new_items.sort_by_key(|item| Reverse(item.published_order));

    if !new_items.is_empty() {
        tracing::info!(source, num_new = new_items.len(), "Found new items");
    }

    Delta {
        new_items,
        watermark,
    }
}
