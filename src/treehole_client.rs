//! High-level TreeHole client with one typed method per endpoint.
//!
//! Every API action goes through a single `api.php` URL and is selected
//! by the `action` query parameter; write endpoints take an urlencoded
//! form body. JSON responses share an envelope (`code`, `msg`, `data`,
//! sometimes `timestamp` / `attention` / `captcha`) which this module
//! decodes before handing typed data to the caller.
//!
//! ## Security
//!
//! The user token is part of every request. It is redacted in Debug
//! output and never recorded in tracing spans.

use base64::Engine as _;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, instrument, warn};
use url::Url;

use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::models::coerce;
use crate::models::{AttentionHole, Comment, Hole, ListHole};
use crate::request::RequestBuilder;
use crate::username::NamePool;
use crate::{DEFAULT_BASE_URL, DEFAULT_IMAGE_URL, JS_API_VERSION, SERVICE_API_VERSION};

/// Browser-shaped headers the service expects on every request.
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("accept", "*/*"),
    ("accept-language", "zh,en-US;q=0.9,en;q=0.8,zh-CN;q=0.7"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("referer", "https://pkuhelper.pku.edu.cn/hole/"),
];

/// High-level TreeHole API client.
///
/// # Example
///
/// ```rust,ignore
/// use treehole_api::TreeHoleClient;
///
/// let client = TreeHoleClient::new("0123456789abcdef0123456789abcdef")?;
/// let (hole, _) = client.get_hole(123456).await?;
/// let page = client.get_comments(hole.pid).await?;
/// ```
#[derive(Clone)]
pub struct TreeHoleClient {
    http: HttpClient,
    token: String,
    base_url: String,
    image_url: Url,
    extra_headers: Vec<(String, String)>,
    base_query: Vec<(String, String)>,
    pool: &'static NamePool,
}

impl std::fmt::Debug for TreeHoleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeHoleClient")
            .field("base_url", &self.base_url)
            .field("image_url", &self.image_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl TreeHoleClient {
    /// Create a new client with the given user token.
    ///
    /// The token is the 32-character alphanumeric string obtainable
    /// from the hole web page; it is validated here, not against the
    /// service.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_config(token, ClientConfig::default())
    }

    /// Create a new client with custom HTTP configuration.
    pub fn with_config(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let token = token.into();
        validate_token(&token)?;
        let http = HttpClient::new(config)?;
        let image_url = Url::parse(DEFAULT_IMAGE_URL)?;
        let base_query = vec![
            ("PKUHelperAPI".to_string(), SERVICE_API_VERSION.to_string()),
            ("jsapiver".to_string(), JS_API_VERSION.to_string()),
            ("user_token".to_string(), token.clone()),
        ];
        Ok(Self {
            http,
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            image_url,
            extra_headers: Vec::new(),
            base_query,
            pool: NamePool::standard(),
        })
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Point the client at a different image base URL.
    pub fn with_image_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.image_url = Url::parse(url.as_ref())?;
        Ok(self)
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter sent with every request.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_query.push((name.into(), value.into()));
        self
    }

    /// Get the user token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the API endpoint URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the image base URL.
    pub fn image_url(&self) -> &str {
        self.image_url.as_str()
    }

    // =========================================================================
    // Read endpoints
    // =========================================================================

    /// Fetch a single post. Returns the post and the server-side
    /// timestamp of the query.
    #[instrument(skip(self))]
    pub async fn get_hole(&self, pid: u64) -> Result<(Hole, i64)> {
        let request = self.get_action("getone").query("pid", pid.to_string());
        let envelope: Envelope<Hole> = self.call(request, "get hole").await?;
        let timestamp = envelope.timestamp.unwrap_or_default();
        let mut hole = require_data(envelope, "get hole")?;
        self.resolve_image_url(&mut hole)?;
        Ok((hole, timestamp))
    }

    /// Fetch the comments on a post, along with whether the current
    /// user follows it.
    #[instrument(skip(self))]
    pub async fn get_comments(&self, pid: u64) -> Result<CommentPage> {
        let request = self.get_action("getcomment").query("pid", pid.to_string());
        let envelope: Envelope<Vec<Comment>> = self.call(request, "get comments").await?;
        let attention = envelope.attention.unwrap_or(false);
        let comments = require_data(envelope, "get comments")?;
        Ok(CommentPage {
            comments,
            attention,
        })
    }

    /// Fetch a page of the front-page listing (pages are 1-based).
    /// Returns the posts and the server-side timestamp of the query.
    #[instrument(skip(self))]
    pub async fn get_holes(&self, page: u32) -> Result<(Vec<ListHole>, i64)> {
        let request = self.get_action("getlist").query("p", page.to_string());
        let envelope: Envelope<Vec<ListHole>> = self.call(request, "get hole list").await?;
        let timestamp = envelope.timestamp.unwrap_or_default();
        let mut holes = require_data(envelope, "get hole list")?;
        for hole in &mut holes {
            self.resolve_image_url(&mut hole.hole)?;
        }
        Ok((holes, timestamp))
    }

    /// Fetch a page of the followed-posts listing (pages are 1-based).
    #[instrument(skip(self))]
    pub async fn get_attention(&self, page: u32) -> Result<(Vec<AttentionHole>, i64)> {
        let request = self.get_action("getattention").query("p", page.to_string());
        let envelope: Envelope<Vec<AttentionHole>> =
            self.call(request, "get attention list").await?;
        let timestamp = envelope.timestamp.unwrap_or_default();
        let mut holes = require_data(envelope, "get attention list")?;
        for hole in &mut holes {
            self.resolve_image_url(&mut hole.hole)?;
        }
        Ok((holes, timestamp))
    }

    /// Search posts. Multiple keywords are space-separated within
    /// `keywords`.
    #[instrument(skip(self))]
    pub async fn search(&self, keywords: &str, page: u32, page_size: u32) -> Result<Vec<Hole>> {
        let request = self
            .get_action("search")
            .query("keywords", keywords)
            .query("page", page.to_string())
            .query("pagesize", page_size.to_string());
        let envelope: Envelope<Vec<Hole>> = self.call(request, "search").await?;
        let mut holes = require_data(envelope, "search")?;
        for hole in &mut holes {
            self.resolve_image_url(hole)?;
        }
        Ok(holes)
    }

    /// Download the image attached to a post. Returns `None` for posts
    /// without an image; otherwise the raw bytes and the content type.
    #[instrument(skip(self, hole), fields(pid = hole.pid))]
    pub async fn get_hole_image(&self, hole: &Hole) -> Result<Option<(Bytes, String)>> {
        if !hole.is_image() {
            return Ok(None);
        }
        // Absolute URLs (already resolved holes) pass through join
        // unchanged; raw relative URLs resolve against the image base.
        let url = self
            .image_url
            .join(hole.url.as_deref().unwrap_or_default())?;
        let request = self
            .http
            .get(url.to_string())
            .headers(self.all_headers());
        let response = self.http.execute(request).await?;
        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?;
        Ok(Some((bytes, content_type)))
    }

    // =========================================================================
    // Write endpoints
    // =========================================================================

    /// Publish a new post, optionally with an image. Returns the new
    /// post's pid.
    #[instrument(skip(self, text, image))]
    pub async fn post_hole(&self, text: &str, image: Option<&[u8]>) -> Result<u64> {
        if text.is_empty() && image.is_none() {
            return Err(Error::new(ErrorKind::EmptyPost));
        }

        let mut load = vec![
            ("user_token".to_string(), self.token.clone()),
            ("text".to_string(), text.to_string()),
        ];
        match image {
            Some(bytes) => {
                load.push(("type".to_string(), "image".to_string()));
                load.push((
                    "image".to_string(),
                    base64::engine::general_purpose::STANDARD.encode(bytes),
                ));
            }
            None => load.push(("type".to_string(), "text".to_string())),
        }

        let request = self.post_action("dopost").form(load);
        let envelope: Envelope<coerce::CoercedU64> = self.call(request, "post hole").await?;
        Ok(require_data(envelope, "post hole")?.0)
    }

    /// Publish a comment on a post. `reply_to` addresses another
    /// commenter, by identifier or by display name; the comment body is
    /// prefixed with `"Re <CanonicalDisplayName>: "`. `None` replies to
    /// the hole owner.
    ///
    /// The id returned by the service is the hole pid, not a comment
    /// id.
    #[instrument(skip(self, text, reply_to))]
    pub async fn post_comment(
        &self,
        pid: u64,
        text: &str,
        reply_to: Option<ReplyTarget>,
    ) -> Result<u64> {
        if text.is_empty() {
            return Err(Error::new(ErrorKind::EmptyPost));
        }

        let text = match reply_to {
            Some(target) => format!("Re {}: {}", target.display_name(self.pool)?, text),
            None => text.to_string(),
        };

        let load = [
            ("user_token".to_string(), self.token.clone()),
            ("pid".to_string(), pid.to_string()),
            ("text".to_string(), text),
        ];
        let request = self.post_action("docomment").form(load);
        let envelope: Envelope<coerce::CoercedU64> = self.call(request, "post comment").await?;
        Ok(require_data(envelope, "post comment")?.0)
    }

    /// Follow a post. Following an already-followed post is a service
    /// error (surfaced as [`ErrorKind::Api`]).
    #[instrument(skip(self))]
    pub async fn set_attention(&self, pid: u64) -> Result<()> {
        self.switch_attention(pid, true).await
    }

    /// Unfollow a post.
    #[instrument(skip(self))]
    pub async fn remove_attention(&self, pid: u64) -> Result<()> {
        self.switch_attention(pid, false).await
    }

    /// Toggle the follow state of a post. Returns the new state.
    #[instrument(skip(self))]
    pub async fn toggle_attention(&self, pid: u64) -> Result<bool> {
        let page = self.get_comments(pid).await?;
        let target = !page.attention;
        if target {
            self.set_attention(pid).await?;
        } else {
            self.remove_attention(pid).await?;
        }
        Ok(target)
    }

    /// Report a post. Reporting your own post gets it deleted and the
    /// account muted, so don't.
    #[instrument(skip(self, reason))]
    pub async fn report(&self, pid: u64, reason: &str) -> Result<()> {
        let load = [
            ("user_token".to_string(), self.token.clone()),
            ("pid".to_string(), pid.to_string()),
            ("reason".to_string(), reason.to_string()),
        ];
        let request = self.post_action("report").form(load);
        let _: Envelope<serde_json::Value> = self.call(request, "report").await?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn switch_attention(&self, pid: u64, on: bool) -> Result<()> {
        let load = [
            ("user_token".to_string(), self.token.clone()),
            ("pid".to_string(), pid.to_string()),
            ("switch".to_string(), if on { "1" } else { "0" }.to_string()),
        ];
        let request = self.post_action("attention").form(load);
        let _: Envelope<serde_json::Value> = self.call(request, "switch attention").await?;
        Ok(())
    }

    fn all_headers(&self) -> Vec<(String, String)> {
        DEFAULT_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .chain(self.extra_headers.iter().cloned())
            .collect()
    }

    fn get_action(&self, action: &str) -> RequestBuilder {
        self.http
            .get(&self.base_url)
            .headers(self.all_headers())
            .query_pairs(self.base_query.iter().cloned())
            .query("action", action)
    }

    fn post_action(&self, action: &str) -> RequestBuilder {
        self.http
            .post(&self.base_url)
            .headers(self.all_headers())
            .query_pairs(self.base_query.iter().cloned())
            .query("action", action)
    }

    /// Execute a request and decode the shared envelope, mapping
    /// non-zero codes and captcha demands to typed errors.
    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Envelope<T>> {
        let response = self.http.execute(request).await?;
        let envelope: Envelope<T> = response.json().await?;

        if envelope.code != 0 {
            let message = envelope.msg.clone().unwrap_or_default();
            error!(code = envelope.code, message = %message, "{what} failed");
            return Err(Error::new(ErrorKind::Api {
                code: envelope.code,
                message,
            }));
        }

        if envelope.captcha.as_ref().is_some_and(is_truthy) {
            warn!("captcha might be required for {what}");
            return Err(Error::new(ErrorKind::Captcha));
        }

        Ok(envelope)
    }

    /// Rewrite a hole's relative image URL against the image base.
    fn resolve_image_url(&self, hole: &mut Hole) -> Result<()> {
        if hole.is_image() {
            let resolved = self
                .image_url
                .join(hole.url.as_deref().unwrap_or_default())?;
            hole.url = Some(resolved.to_string());
        }
        Ok(())
    }
}

/// A post's comments plus the caller's follow state, as returned by the
/// getcomment action.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPage {
    /// Comments in thread order.
    pub comments: Vec<Comment>,
    /// Whether the current user follows the post.
    pub attention: bool,
}

/// A reply target for [`TreeHoleClient::post_comment`]: either a
/// commenter's integer identifier or their display name in any casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyTarget {
    /// Commenter position, encoded through the username codec.
    Identifier(u64),
    /// Display name, validated and canonicalized through the codec.
    Name(String),
}

impl ReplyTarget {
    /// Resolve to the canonical display name used in the comment body.
    fn display_name(&self, pool: &NamePool) -> Result<String> {
        match self {
            ReplyTarget::Identifier(id) => Ok(pool.encode(*id)),
            ReplyTarget::Name(name) => pool.canonicalize(name),
        }
    }
}

impl From<u64> for ReplyTarget {
    fn from(id: u64) -> Self {
        ReplyTarget::Identifier(id)
    }
}

impl From<&str> for ReplyTarget {
    fn from(name: &str) -> Self {
        ReplyTarget::Name(name.to_string())
    }
}

impl From<String> for ReplyTarget {
    fn from(name: String) -> Self {
        ReplyTarget::Name(name)
    }
}

/// Shared response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(deserialize_with = "coerce::i64_or_string")]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    captcha: Option<serde_json::Value>,
    #[serde(default)]
    data: Option<T>,
    #[serde(default, deserialize_with = "coerce::opt_i64_or_string")]
    timestamp: Option<i64>,
    #[serde(default, deserialize_with = "coerce::opt_bool_01")]
    attention: Option<bool>,
}

fn require_data<T>(envelope: Envelope<T>, what: &str) -> Result<T> {
    envelope
        .data
        .ok_or_else(|| Error::new(ErrorKind::Json(format!("missing data in {what} response"))))
}

/// Python-style truthiness for the loosely-typed captcha field.
fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}

fn validate_token(token: &str) -> Result<()> {
    if token.len() != 32 {
        return Err(Error::new(ErrorKind::Config(
            "user token must be 32 characters long".to_string(),
        )));
    }
    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::new(ErrorKind::Config(
            "user token must be alphanumeric".to_string(),
        )));
    }
    Ok(())
}
