use std::borrow::Cow;

use crate::{config::YoutubeApi, delta::Fetch, types::FeedItem};

use anyhow::Context as _;
use reqwest::{blocking::Client, header, StatusCode};
use serde::Deserialize;
use smartstring::alias::String as SmallString;
use url::Url;

const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";
const WATCH_URL: &str = "https://www.youtube.com/watch";
/// The most the API hands out in a single page
const NUM_LATEST_ITEMS: u32 = 50;

pub trait FeedSource {
    /// Fetches the newest items for `source`, presenting `change_token` so that the source can
    /// reply with [`Fetch::Unchanged`] when there's nothing new
    fn fetch(&self, source: &str, change_token: Option<&str>) -> anyhow::Result<Fetch>;
}

pub struct Youtube {
    client: Client,
    api_key: String,
}

impl Youtube {
    pub fn new(YoutubeApi { api_key }: &YoutubeApi, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed building youtube client")?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
        })
    }
}

impl FeedSource for Youtube {
    fn fetch(&self, source: &str, change_token: Option<&str>) -> anyhow::Result<Fetch> {
        let playlist = uploads_playlist(source);
        let max_results = NUM_LATEST_ITEMS.to_string();
        let url = Url::parse_with_params(
            PLAYLIST_ITEMS_URL,
            &[
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("playlistId", &*playlist),
                ("key", self.api_key.as_str()),
            ],
        )?;

        let mut request = self.client.get(url);
        if let Some(token) = change_token {
            request = request.header(header::IF_NONE_MATCH, token);
        }

        // Urls carry the api key, so keep them out of any errors
        let response = request.send().map_err(reqwest::Error::without_url)?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(Fetch::Unchanged);
        }
        let response = response
            .error_for_status()
            .map_err(reqwest::Error::without_url)?;

        let header_etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|etag| etag.to_str().ok())
            .map(ToOwned::to_owned);
        let page: PlaylistPage = response.json().map_err(reqwest::Error::without_url)?;

        let change_token = page.etag.clone().or(header_etag);
        let items = page.into_items();
        tracing::debug!(source, %playlist, num_items = items.len(), "Fetched playlist");

        Ok(Fetch::Items {
            items,
            change_token,
        })
    }
}

/// Channel ids (`UC...`) get mapped to the channel's uploads playlist (`UU...`)
fn uploads_playlist(source: &str) -> Cow<'_, str> {
    match source.strip_prefix("UC") {
        Some(rest) => Cow::Owned(format!("UU{rest}")),
        None => Cow::Borrowed(source),
    }
}

#[derive(Deserialize)]
struct PlaylistPage {
    etag: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

impl PlaylistPage {
    fn into_items(self) -> Vec<FeedItem> {
        self.items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, PlaylistItem { snippet })| {
                let Snippet {
                    title,
                    position,
                    resource_id: ResourceId { video_id },
                } = snippet;
                let video_id = video_id.filter(|id| !id.is_empty())?;
                let url = Url::parse_with_params(WATCH_URL, &[("v", video_id.as_str())]).ok()?;

                Some(FeedItem {
                    id: SmallString::from(video_id),
                    title,
                    published_order: position.unwrap_or(idx as u32),
                    url,
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct PlaylistItem {
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    position: Option<u32>,
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_to_uploads() {
        assert_eq!(uploads_playlist("UCabc"), "UUabc");
        assert_eq!(uploads_playlist("PLabc"), "PLabc");
        assert_eq!(uploads_playlist("UUabc"), "UUabc");
    }

    #[test]
    fn parse_page() {
        let body = r#"{
            "kind": "youtube#playlistItemListResponse",
            "etag": "page-etag",
            "items": [
                {
                    "snippet": {
                        "title": "Newest upload",
                        "position": 0,
                        "resourceId": { "kind": "youtube#video", "videoId": "newVid" }
                    }
                },
                {
                    "snippet": {
                        "title": "Not a video",
                        "position": 1,
                        "resourceId": { "kind": "youtube#channel" }
                    }
                },
                {
                    "snippet": {
                        "title": "Older upload",
                        "position": 2,
                        "resourceId": { "kind": "youtube#video", "videoId": "oldVid" }
                    }
                }
            ]
        }"#;

        let page: PlaylistPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.etag.as_deref(), Some("page-etag"));

        let items = page.into_items();
        insta::assert_debug_snapshot!(items, @r###"
        [
            FeedItem {
                id: "newVid",
                title: "Newest upload",
                published_order: 0,
                url: "https://www.youtube.com/watch?v=newVid",
            },
            FeedItem {
                id: "oldVid",
                title: "Older upload",
                published_order: 2,
                url: "https://www.youtube.com/watch?v=oldVid",
            },
        ]
        "###);
    }
}
