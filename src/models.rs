//! Data models for holes (posts) and comments.
//!
//! The service is loose about numeric fields: depending on the endpoint
//! (and sometimes the record) they arrive as JSON numbers or as decimal
//! strings. Every numeric field here accepts both.

use serde::{Deserialize, Serialize};

/// A TreeHole post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    /// Post ID.
    #[serde(deserialize_with = "coerce::u64_or_string")]
    pub pid: u64,
    /// Creation timestamp (unix seconds).
    #[serde(deserialize_with = "coerce::i64_or_string")]
    pub timestamp: i64,
    /// Post kind; the service currently emits "text" and "image".
    #[serde(rename = "type")]
    pub kind: String,
    /// Post body.
    pub text: String,
    /// Image URL, relative to the image base until resolved by the
    /// client. Only meaningful for image posts.
    #[serde(default)]
    pub url: Option<String>,
    /// Number of comments.
    #[serde(deserialize_with = "coerce::u64_or_string")]
    pub reply: u64,
    /// Number of followers.
    #[serde(deserialize_with = "coerce::u64_or_string")]
    pub likenum: u64,
    /// Post tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Extra counter; meaning undocumented upstream.
    #[serde(default, deserialize_with = "coerce::opt_i64_or_string")]
    pub extra: Option<i64>,
}

impl Hole {
    /// Returns true if this post carries an image.
    pub fn is_image(&self) -> bool {
        self.kind == "image" && self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// A post as returned by the front-page listing, with listing-only
/// fields on top of [`Hole`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListHole {
    #[serde(flatten)]
    pub hole: Hole,
    /// Whether the post is hidden.
    #[serde(deserialize_with = "coerce::bool_01")]
    pub hidden: bool,
    /// Hotness timestamp; in practice tracks `timestamp`.
    #[serde(deserialize_with = "coerce::i64_or_string")]
    pub hot: i64,
}

/// A post as returned by the followed-posts listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionHole {
    #[serde(flatten)]
    pub hole: Hole,
    /// Follow tag; meaning undocumented upstream.
    #[serde(default)]
    pub attention_tag: Option<String>,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID.
    #[serde(deserialize_with = "coerce::u64_or_string")]
    pub cid: u64,
    /// ID of the post this comment belongs to.
    #[serde(deserialize_with = "coerce::u64_or_string")]
    pub pid: u64,
    /// Creation timestamp (unix seconds).
    #[serde(deserialize_with = "coerce::i64_or_string")]
    pub timestamp: i64,
    /// Commenter pseudonym, a display name in the username codec's
    /// namespace.
    pub name: String,
    /// Comment body.
    pub text: String,
    /// Whether the commenter is the hole owner.
    #[serde(deserialize_with = "coerce::bool_01")]
    pub islz: bool,
    /// Comment tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Anonymity flag; meaning undocumented upstream.
    #[serde(default, deserialize_with = "coerce::opt_bool_01")]
    pub anonymous: Option<bool>,
}

/// Deserializers accepting the service's mixed number/string encoding.
pub(crate) mod coerce {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNum {
        Num(i64),
        Str(String),
    }

    impl RawNum {
        fn as_i64<E: serde::de::Error>(&self) -> Result<i64, E> {
            match self {
                RawNum::Num(n) => Ok(*n),
                RawNum::Str(s) => s.trim().parse().map_err(E::custom),
            }
        }
    }

    pub fn i64_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        RawNum::deserialize(d)?.as_i64()
    }

    pub fn u64_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let n = RawNum::deserialize(d)?.as_i64::<D::Error>()?;
        u64::try_from(n).map_err(serde::de::Error::custom)
    }

    pub fn opt_i64_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Option::<RawNum>::deserialize(d)? {
            Some(raw) => raw.as_i64().map(Some),
            None => Ok(None),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Num(i64),
        Str(String),
    }

    impl RawFlag {
        fn as_bool<E: serde::de::Error>(&self) -> Result<bool, E> {
            match self {
                RawFlag::Bool(b) => Ok(*b),
                RawFlag::Num(n) => Ok(*n != 0),
                RawFlag::Str(s) => s.trim().parse::<i64>().map(|n| n != 0).map_err(E::custom),
            }
        }
    }

    pub fn bool_01<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        RawFlag::deserialize(d)?.as_bool()
    }

    pub fn opt_bool_01<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<RawFlag>::deserialize(d)? {
            Some(raw) => raw.as_bool().map(Some),
            None => Ok(None),
        }
    }

    /// Transparent wrapper for envelope `data` fields that hold a bare
    /// id, emitted as either a number or a decimal string.
    #[derive(Debug, Deserialize)]
    #[serde(transparent)]
    pub struct CoercedU64(#[serde(deserialize_with = "u64_or_string")] pub u64);
}
