#![forbid(unsafe_code)]

//! Title, author and thumbnail lookup through the noembed oEmbed proxy.
//!
//! Every failure collapses into `None`: callers only ever want the details
//! as a nicety (pre-filling a filename, showing a preview), so a missing
//! network or an odd upstream response must never abort them. The reason is
//! still logged at `warn` level.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::video_id::is_valid_video_id;

pub const DEFAULT_DETAILS_ENDPOINT: &str = "https://noembed.com/embed";

static THUMBNAIL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://i\.ytimg\.com/vi/[0-9a-zA-Z_-]{11}/hqdefault\.jpg$")
        .expect("valid thumbnail regex")
});

/// Validated metadata of a single video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub title: String,
    /// Always an `i.ytimg.com/vi/<id>/hqdefault.jpg` URL.
    pub image_url: String,
    pub author: String,
}

/// Only the fields we keep from the noembed payload. Deserialization fails
/// when any of them is missing or not a string.
#[derive(Debug, Deserialize)]
struct EmbedPayload {
    title: String,
    thumbnail_url: String,
    author_name: String,
}

/// Performs a GET and parses the body as JSON.
pub trait JsonFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value>;
}

impl<T: JsonFetcher + ?Sized> JsonFetcher for &T {
    fn fetch_json(&self, url: &str) -> Result<Value> {
        (**self).fetch_json(url)
    }
}

/// Blocking HTTP fetcher backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl UreqFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("clipline/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl JsonFetcher for UreqFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("requesting {url}"))?;
        response
            .into_json::<Value>()
            .with_context(|| format!("parsing response from {url}"))
    }
}

pub struct DetailsLoader<F> {
    fetcher: F,
    endpoint: String,
}

impl<F: JsonFetcher> DetailsLoader<F> {
    pub fn new(fetcher: F, endpoint: impl Into<String>) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.into(),
        }
    }

    /// Looks up a video by id. Malformed ids return `None` without touching
    /// the network.
    pub fn load(&self, video_id: &str) -> Option<VideoDetails> {
        if !is_valid_video_id(video_id) {
            debug!("not a video id, skipping details lookup: {video_id:?}");
            return None;
        }

        match self.try_load(video_id) {
            Ok(details) => Some(details),
            Err(err) => {
                warn!("could not load details for {video_id}: {err:#}");
                None
            }
        }
    }

    fn try_load(&self, video_id: &str) -> Result<VideoDetails> {
        let url = details_url(&self.endpoint, video_id);
        debug!("fetching video details from {url}");
        let json = self.fetcher.fetch_json(&url).context("fetch failed")?;
        parse_details(json)
    }
}

/// One-shot lookup against noembed with the default timeout.
pub fn load_video_details(video_id: &str) -> Option<VideoDetails> {
    DetailsLoader::new(UreqFetcher::default(), DEFAULT_DETAILS_ENDPOINT).load(video_id)
}

/// `<endpoint>?url=https://www.youtube.com/watch?v=<id>`
pub fn details_url(endpoint: &str, video_id: &str) -> String {
    format!("{endpoint}?url=https://www.youtube.com/watch?v={video_id}")
}

pub fn is_valid_thumbnail_url(url: &str) -> bool {
    THUMBNAIL_URL.is_match(url)
}

fn parse_details(json: Value) -> Result<VideoDetails> {
    let payload: EmbedPayload = serde_json::from_value(json.clone())
        .with_context(|| format!("fetch result failed validation: {json}"))?;
    if !is_valid_thumbnail_url(&payload.thumbnail_url) {
        bail!(
            "fetch result failed validation: unexpected thumbnail url {}",
            payload.thumbnail_url
        );
    }
    Ok(VideoDetails {
        title: payload.title,
        image_url: payload.thumbnail_url,
        author: payload.author_name,
    })
}
