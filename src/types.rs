use std::fmt;

use crate::utils;

use smartstring::alias::String as SmallString;
use url::Url;

const DEBUG_FIELD_TRUNCATE_LEN: usize = 60;

/// A single video pulled from a source feed
#[derive(Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: SmallString,
    pub title: String,
    /// Position in the feed's newest-first ordering (`0` is the newest)
    pub published_order: u32,
    pub url: Url,
}

impl fmt::Debug for FeedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            id,
            title,
            published_order,
            url,
        } = &self;

        let mut debug_struct = f.debug_struct("FeedItem");
        debug_struct.field("id", id);

        let truncated_title = utils::truncate_str(title, DEBUG_FIELD_TRUNCATE_LEN);
        debug_struct.field("title", &truncated_title);

        debug_struct.field("published_order", published_order);
        debug_struct.field("url", &url.as_str());

        debug_struct.finish()
    }
}

/// A post that already lives on a destination
#[derive(Clone, Debug)]
pub struct RecentEntry {
    pub url: String,
}
