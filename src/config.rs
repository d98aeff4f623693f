use std::{fs, path::Path, slice};

use anyhow::Context as _;
use serde::{de::Error as DeError, Deserialize, Deserializer};
use smartstring::alias::String as SmallString;

#[derive(Deserialize)]
pub struct Secrets {
    pub reddit: RedditOauth2,
    pub youtube: YoutubeApi,
}

impl Secrets {
    pub fn load(secrets_path: &Path) -> anyhow::Result<Self> {
        tracing::info!(secrets_path = %secrets_path.display(), "Reading secrets at path");
        let secrets_text = fs::read_to_string(secrets_path)
            .with_context(|| format!("Failed reading secrets at {}", secrets_path.display()))?;
        Self::parse(&secrets_text)
    }

    fn parse(secrets_text: &str) -> anyhow::Result<Self> {
        let secrets: Self = toml::from_str(secrets_text).context("Malformed secrets file")?;

        let Self {
            reddit:
                RedditOauth2 {
                    client_id,
                    client_secret,
                    username,
                    password,
                    user_agent,
                },
            youtube: YoutubeApi { api_key },
        } = &secrets;
        let required = [
            ("reddit.client_id", client_id),
            ("reddit.client_secret", client_secret),
            ("reddit.username", username),
            ("reddit.password", password),
            ("reddit.user_agent", user_agent),
            ("youtube.api_key", api_key),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Required setting `{name}` is not set");
            }
        }

        Ok(secrets)
    }
}

#[derive(Deserialize, Clone)]
pub struct RedditOauth2 {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    /// The client identity reddit's API requires on every request
    pub user_agent: String,
}

#[derive(Deserialize)]
pub struct YoutubeApi {
    pub api_key: String,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_repost_protection")]
    pub repost_protection: bool,
    #[serde(rename = "mapping")]
    pub mappings: Mappings,
}

fn default_repost_protection() -> bool {
    true
}

impl Config {
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        tracing::info!(config_path = %config_path.display(), "Reading config at path");
        let config_text = fs::read_to_string(config_path)
            .with_context(|| format!("Failed reading config at {}", config_path.display()))?;
        let config = toml::from_str(&config_text).context("Malformed config file")?;

        Ok(config)
    }
}

/// Where a single source's new items get posted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub source: SmallString,
    pub destinations: Vec<SmallString>,
}

/// All configured mappings, at most one per source
///
/// Built from the raw `[[mapping]]` tables where `to` can either be a single destination or a
/// list of them. Repeated sources get merged in the order they first appear
#[derive(Debug)]
pub struct Mappings(Vec<Mapping>);

impl Mappings {
    fn new(raw: Vec<RawMapping>) -> anyhow::Result<Self> {
        let mut mappings: Vec<Mapping> = Vec::new();

        for RawMapping { from, to } in raw {
            let from = from.trim();
            if from.is_empty() {
                anyhow::bail!("Mapping has an empty `from`");
            }

            let to = match to {
                OneOrMany::One(dest) => vec![dest],
                OneOrMany::Many(dests) => dests,
            };
            if to.is_empty() {
                anyhow::bail!("Mapping for `{from}` has no destinations");
            }

            let idx = match mappings.iter().position(|m| m.source.as_str() == from) {
                Some(idx) => idx,
                None => {
                    mappings.push(Mapping {
                        source: SmallString::from(from),
                        destinations: Vec::new(),
                    });
                    mappings.len() - 1
                }
            };
            let destinations = &mut mappings[idx].destinations;
            for dest in &to {
                let dest = dest.trim();
                if dest.is_empty() {
                    anyhow::bail!("Mapping for `{from}` has an empty destination");
                }
                if !destinations.iter().any(|known| known.as_str() == dest) {
                    destinations.push(SmallString::from(dest));
                }
            }
        }

        if mappings.is_empty() {
            anyhow::bail!("No mappings configured");
        }

        Ok(Self(mappings))
    }

    pub fn iter(&self) -> slice::Iter<'_, Mapping> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for Mappings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = <Vec<RawMapping>>::deserialize(deserializer)?;
        Mappings::new(raw).map_err(DeError::custom)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMapping {
    from: String,
    to: OneOrMany,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}
