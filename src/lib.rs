//! # treehole-api
//!
//! Client library for the TreeHole forum service.
//!
//! This crate provides:
//! - **Typed endpoints** - Fetch posts, comments, and listings; search;
//!   follow/unfollow; post content; report content
//! - **Username codec** - The reversible mapping between integer
//!   identifiers and pseudonymous display names ("Angry Alice",
//!   "You Win 1234"), used to address reply targets in comments
//! - **HTTP infrastructure** - Retry with exponential backoff and jitter,
//!   compression, connection pooling, request/response tracing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TreeHoleClient                           │
//! │  - Holds the user token + base URLs                         │
//! │  - One typed async method per service endpoint              │
//! │  - Envelope decoding (code / captcha / data)                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HttpClient                             │
//! │  - Raw HTTP with retry, compression, rate limiting          │
//! │  - Request building and response handling                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The username codec ([`username`]) is pure computation over an
//! immutable word pool and has no dependency on the HTTP layers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use treehole_api::{ReplyTarget, TreeHoleClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), treehole_api::Error> {
//!     let client = TreeHoleClient::new("0123456789abcdef0123456789abcdef")?;
//!
//!     // Fetch a post and its comments
//!     let (hole, _fetched_at) = client.get_hole(123456).await?;
//!     let page = client.get_comments(hole.pid).await?;
//!
//!     // Reply to the third pseudonym ("Carol")
//!     client
//!         .post_comment(hole.pid, "agreed!", Some(ReplyTarget::Identifier(2)))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
pub mod models;
mod request;
mod response;
mod retry;
mod treehole_client;
pub mod username;

pub use client::HttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use models::{AttentionHole, Comment, Hole, ListHole};
pub use request::{RequestBody, RequestBuilder, RequestMethod};
pub use response::Response;
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use treehole_client::{CommentPage, ReplyTarget, TreeHoleClient};
pub use username::NamePool;

/// Default service endpoint. Every API action is dispatched through this
/// single URL via the `action` query parameter.
pub const DEFAULT_BASE_URL: &str = "https://pkuhelper.pku.edu.cn/services/pkuhole/api.php";

/// Default base for post image downloads; hole image URLs are stored
/// relative to this.
pub const DEFAULT_IMAGE_URL: &str = "https://pkuhelper.pku.edu.cn/services/pkuhole/images/";

/// Service API version sent as the `PKUHelperAPI` query parameter.
pub const SERVICE_API_VERSION: &str = "3.0";

/// Frontend script version sent as the `jsapiver` query parameter.
pub const JS_API_VERSION: &str = "201027113050-462894";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("treehole-api/", env!("CARGO_PKG_VERSION"));
