//! Detects items that someone else already posted to a destination

use crate::types::{FeedItem, RecentEntry};

/// Checks if `item` already shows up in a destination's recent posts
///
/// This is a loose match on purpose. Destination urls embed the video id verbatim, so any url
/// containing it (short links, extra tracking params, etc.) counts as a repost
pub fn is_probable_duplicate(item: &FeedItem, recent: &[RecentEntry]) -> bool {
    // An empty id would match everything
    if item.id.is_empty() {
        return false;
    }

    recent.iter().any(|entry| entry.url.contains(item.id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use smartstring::alias::String as SmallString;
    use url::Url;

    fn item(id: &str) -> FeedItem {
        FeedItem {
            id: SmallString::from(id),
            title: "Some video".to_owned(),
            published_order: 0,
            url: Url::parse_with_params("https://www.youtube.com/watch", &[("v", id)]).unwrap(),
        }
    }

    fn recent(urls: &[&str]) -> Vec<RecentEntry> {
        urls.iter()
            .map(|url| RecentEntry {
                url: (*url).to_owned(),
            })
            .collect()
    }

    #[test]
    fn matches_id_anywhere_in_url() {
        let posted = recent(&[
            "https://github.com/rust-lang/rust",
            "https://youtu.be/abc123?t=42",
        ]);
        assert!(is_probable_duplicate(&item("abc123"), &posted));

        let posted = recent(&["https://www.youtube.com/watch?v=abc123&feature=share"]);
        assert!(is_probable_duplicate(&item("abc123"), &posted));
    }

    #[test]
    fn no_match() {
        let posted = recent(&[
            "https://www.youtube.com/watch?v=xyz789",
            "https://example.com/abc12",
        ]);
        assert!(!is_probable_duplicate(&item("abc123"), &posted));
        assert!(!is_probable_duplicate(&item("abc123"), &[]));
        assert!(!is_probable_duplicate(&item(""), &posted));
    }
}
