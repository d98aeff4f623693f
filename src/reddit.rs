use crate::{config::RedditOauth2, types::RecentEntry, utils};

use roux::{submission::SubmissionData, Me, Subreddit};
use serde::Deserialize;
use smartstring::alias::String as SmallString;
use url::Url;

/// How far back to look for reposts on a subreddit
const NUM_RECENT_POSTS: u32 = 100;
/// Reddit rejects any longer titles
const MAX_TITLE_LEN: usize = 300;

#[derive(Debug, thiserror::Error)]
#[error("Submission to r/{community} was rejected: {reason}")]
pub struct SubmitError {
    pub community: SmallString,
    pub reason: String,
}

/// Somewhere that new items get posted to
pub trait Destination {
    type Session: Session;

    fn authenticate(&self) -> anyhow::Result<Self::Session>;
}

/// An authenticated connection to a [`Destination`]
pub trait Session {
    type Community;

    fn resolve(&self, name: &str) -> anyhow::Result<Self::Community>;
    fn recent_entries(&self, community: &Self::Community) -> anyhow::Result<Vec<RecentEntry>>;
    fn submit(&self, community: &Self::Community, title: &str, url: &Url)
        -> Result<(), SubmitError>;
}

pub struct Reddit {
    oauth: RedditOauth2,
}

impl Reddit {
    pub fn new(oauth: RedditOauth2) -> Self {
        Self { oauth }
    }
}

impl Destination for Reddit {
    type Session = RedditSession;

    fn authenticate(&self) -> anyhow::Result<RedditSession> {
        let RedditOauth2 {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        } = &self.oauth;

        tracing::info!(username, "Logging into reddit");
        let me = roux::Reddit::new(user_agent, client_id, client_secret)
            .username(username)
            .password(password)
            .login()
            .map_err(|e| anyhow::anyhow!("Failed logging into reddit as u/{username}: {e}"))?;

        Ok(RedditSession { me })
    }
}

pub struct RedditSession {
    me: Me,
}

pub struct Community {
    name: SmallString,
    inner: Subreddit,
}

impl Session for RedditSession {
    type Community = Community;

    fn resolve(&self, name: &str) -> anyhow::Result<Community> {
        let name = name.trim_start_matches("r/");
        if name.is_empty() {
            anyhow::bail!("Empty subreddit name");
        }

        Ok(Community {
            name: SmallString::from(name),
            inner: Subreddit::new(name),
        })
    }

    fn recent_entries(&self, community: &Community) -> anyhow::Result<Vec<RecentEntry>> {
        let submissions = community
            .inner
            .latest(NUM_RECENT_POSTS, None)
            .map_err(|e| anyhow::anyhow!("Failed listing r/{}: {e}", community.name))?;

        let entries = submissions
            .data
            .children
            .into_iter()
            .filter_map(|container| RecentEntry::from_submission(container.data))
            .collect();
        Ok(entries)
    }

    fn submit(&self, community: &Community, title: &str, url: &Url) -> Result<(), SubmitError> {
        let rejected = |reason: String| SubmitError {
            community: community.name.clone(),
            reason,
        };

        let title = utils::truncate_str(title.trim(), MAX_TITLE_LEN);
        let response = self
            .me
            .submit_link(&title, url.as_str(), &community.name)
            .map_err(|e| rejected(e.to_string()))?;
        // Rejections (ratelimits, already submitted links, etc.) still come back as a 200
        let body = response
            .error_for_status()
            .and_then(|response| response.text())
            .map_err(|e| rejected(e.to_string()))?;

        match rejection_reason(&body) {
            Some(reason) => Err(rejected(reason)),
            None => Ok(()),
        }
    }
}

/// Reddit replies to `api/submit` with either `{"json": {"errors": [...]}}` or the older jquery
/// style `{"success": false, ...}`
#[derive(Deserialize, Default)]
#[serde(default)]
struct SubmitResponse {
    json: Option<SubmitResponseJson>,
    success: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SubmitResponseJson {
    /// Each error looks like `["RATELIMIT", "you are doing that too much", "ratelimit"]`
    errors: Vec<Vec<serde_json::Value>>,
}

fn rejection_reason(body: &str) -> Option<String> {
    let Ok(response) = serde_json::from_str::<SubmitResponse>(body) else {
        tracing::debug!(body = %utils::truncate_str(body, 200), "Unrecognized submit response");
        return None;
    };

    let errors: Vec<String> = response
        .json
        .map(|json| json.errors)
        .unwrap_or_default()
        .iter()
        .map(|error| {
            let parts: Vec<&str> = error.iter().take(2).filter_map(|part| part.as_str()).collect();
            parts.join(": ")
        })
        .collect();

    if !errors.is_empty() {
        Some(errors.join("; "))
    } else if response.success == Some(false) {
        Some("Submission was not accepted".to_owned())
    } else {
        None
    }
}

impl RecentEntry {
    /// Only link posts can be reposts
    fn from_submission(SubmissionData { url, is_self, .. }: SubmissionData) -> Option<Self> {
        if is_self {
            return None;
        }

        url.map(|url| Self { url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_submission() {
        let body = r#"{"json": {"errors": [], "data": {"url": "https://www.reddit.com/r/videos/comments/abc/", "id": "abc", "name": "t3_abc"}}}"#;
        assert_eq!(rejection_reason(body), None);

        let body = r#"{"jquery": [], "success": true}"#;
        assert_eq!(rejection_reason(body), None);
    }

    #[test]
    fn rejected_submission() {
        let body = r#"{"json": {"errors": [["RATELIMIT", "Looks like you've been doing that a lot. Take a break for 9 minutes before trying again.", "ratelimit"]]}}"#;
        assert_eq!(
            rejection_reason(body).as_deref(),
            Some("RATELIMIT: Looks like you've been doing that a lot. Take a break for 9 minutes before trying again.")
        );

        let body = r#"{"json": {"errors": [["ALREADY_SUB", "that link has already been submitted", "url"], ["BAD_SR_NAME", null, "sr"]]}}"#;
        assert_eq!(
            rejection_reason(body).as_deref(),
            Some("ALREADY_SUB: that link has already been submitted; BAD_SR_NAME")
        );

        let body = r#"{"jquery": [[0, 1, "call", ["body"]]], "success": false}"#;
        assert_eq!(
            rejection_reason(body).as_deref(),
            Some("Submission was not accepted")
        );
    }

    #[test]
    fn rejection_becomes_submit_error() {
        let body = r#"{"json": {"errors": [["RATELIMIT", "you are doing that too much", "ratelimit"]]}}"#;
        let err = SubmitError {
            community: SmallString::from("videos"),
            reason: rejection_reason(body).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Submission to r/videos was rejected: RATELIMIT: you are doing that too much"
        );
    }

    #[test]
    fn unrecognized_body_is_not_a_rejection() {
        assert_eq!(rejection_reason("<html>ok</html>"), None);
    }
}
