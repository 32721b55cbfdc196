//! Pseudonym username codec.
//!
//! TreeHole shows commenters under deterministic pseudonyms instead of
//! account names. A commenter's position in the thread (0-based, the
//! hole owner being 0) maps to a display name drawn from a fixed
//! "prefix + suffix" word pool:
//!
//! - positions `0..S` get a bare suffix ("Alice", "Bob", ...),
//! - positions `S..P*S` get a prefix-suffix pair ("Angry Alice"),
//! - positions past the pool's capacity fall back to the overflow
//!   marker followed by the position itself ("You Win 1234").
//!
//! The mapping is a bijection: [`encode`] and [`decode`] invert each
//! other, and [`decode`] accepts any casing of a valid name. All
//! operations are pure functions over the immutable [`NamePool`]; they
//! are safe to call from any thread.
//!
//! ```
//! use treehole_api::username;
//!
//! assert_eq!(username::encode(48), "Angry Winnie");
//! assert_eq!(username::decode("angry winnie").unwrap(), 48);
//! assert_eq!(username::decode("You Win 1234").unwrap(), 1234);
//! assert!(!username::contains("a_lice").unwrap());
//! ```

use crate::error::{Error, ErrorKind, Result};

/// Prefix word list. The empty first entry covers the bare-suffix
/// regime: positions below the suffix count render without a prefix.
pub const PREFIXES: &[&str] = &[
    "",
    "Angry",
    "Baby",
    "Crazy",
    "Diligent",
    "Excited",
    "Fat",
    "Greedy",
    "Hungry",
    "Interesting",
    "Jolly",
    "Kind",
    "Little",
    "Magic",
    "Naïve",
    "Old",
    "Powerful",
    "Quiet",
    "Rich",
    "Superman",
    "THU",
    "Undefined",
    "Valuable",
    "Wifeless",
    "Xiangbuchulai",
    "Young",
    "Zombie",
];

/// Suffix word list.
pub const SUFFIXES: &[&str] = &[
    "Alice",
    "Bob",
    "Carol",
    "Dave",
    "Eve",
    "Francis",
    "Grace",
    "Hans",
    "Isabella",
    "Jason",
    "Kate",
    "Louis",
    "Margaret",
    "Nathan",
    "Olivia",
    "Paul",
    "Queen",
    "Richard",
    "Susan",
    "Thomas",
    "Uma",
    "Vivian",
    "Winnie",
    "Xander",
    "Yasmine",
    "Zach",
];

/// Two-word marker prepended to positions past the pool's capacity.
pub const OVERFLOW: &str = "You Win";

/// The pool used by the live TreeHole service.
static STANDARD: NamePool = NamePool::new(PREFIXES, SUFFIXES, OVERFLOW);

/// An immutable pseudonym namespace: ordered prefix and suffix word
/// lists plus an overflow marker.
///
/// The pool sizes are never hardcoded in the codec; swap in a different
/// pool and the arithmetic adapts.
#[derive(Debug, Clone, Copy)]
pub struct NamePool {
    prefixes: &'static [&'static str],
    suffixes: &'static [&'static str],
    overflow: &'static str,
}

impl NamePool {
    /// Create a pool over custom word lists.
    ///
    /// The first prefix entry is expected to be the empty string; it is
    /// what makes identifiers below the suffix count render as a bare
    /// suffix.
    pub const fn new(
        prefixes: &'static [&'static str],
        suffixes: &'static [&'static str],
        overflow: &'static str,
    ) -> Self {
        Self {
            prefixes,
            suffixes,
            overflow,
        }
    }

    /// The pool used by the live service (27 prefixes, 26 suffixes).
    pub fn standard() -> &'static NamePool {
        &STANDARD
    }

    /// Number of combinatorial (non-overflow) names, `P * S`.
    pub fn capacity(&self) -> u64 {
        self.prefixes.len() as u64 * self.suffixes.len() as u64
    }

    /// Encode an identifier into its canonical display name.
    ///
    /// Total over all of `u64`: identifiers at or past [`capacity`]
    /// become `"You Win <n>"`.
    ///
    /// [`capacity`]: NamePool::capacity
    pub fn encode(&self, id: u64) -> String {
        let s = self.suffixes.len() as u64;
        if id >= self.capacity() {
            return format!("{} {}", self.overflow, id);
        }
        if id < s {
            self.suffixes[id as usize].to_string()
        } else {
            format!(
                "{} {}",
                self.prefixes[(id / s) as usize],
                self.suffixes[(id % s) as usize]
            )
        }
    }

    /// Check whether `name` is a well-formed pseudonym in this pool,
    /// matching case-insensitively.
    ///
    /// Fails with `InvalidFormat` when the input does not split into
    /// 1-3 whitespace-separated tokens (that includes empty input).
    pub fn contains(&self, name: &str) -> Result<bool> {
        let tokens = self.tokens(name)?;
        Ok(match tokens.as_slice() {
            [suffix] => find_word(self.suffixes, suffix).is_some(),
            [prefix, suffix] => {
                find_word(self.prefixes, prefix).is_some()
                    && find_word(self.suffixes, suffix).is_some()
            }
            [first, second, digits] => {
                self.is_overflow_marker(first, second) && is_decimal(digits)
            }
            _ => unreachable!("tokens() yields 1-3 tokens"),
        })
    }

    /// Decode a display name back into its identifier.
    ///
    /// Matching is case-insensitive. Fails with `InvalidFormat` for a
    /// bad token count and `InvalidName` when the tokens match no
    /// pseudonym pattern (or an overflow number exceeds `u64`).
    pub fn decode(&self, name: &str) -> Result<u64> {
        let tokens = self.tokens(name)?;
        let s = self.suffixes.len() as u64;
        let invalid = || Error::new(ErrorKind::InvalidName(name.to_string()));

        match tokens.as_slice() {
            [suffix] => find_word(self.suffixes, suffix)
                .map(|i| i as u64)
                .ok_or_else(invalid),
            [prefix, suffix] => {
                let p = find_word(self.prefixes, prefix).ok_or_else(invalid)?;
                let sfx = find_word(self.suffixes, suffix).ok_or_else(invalid)?;
                Ok(p as u64 * s + sfx as u64)
            }
            [first, second, digits] => {
                if !self.is_overflow_marker(first, second) || !is_decimal(digits) {
                    return Err(invalid());
                }
                digits.parse::<u64>().map_err(|e| {
                    Error::with_source(ErrorKind::InvalidName(name.to_string()), e)
                })
            }
            _ => unreachable!("tokens() yields 1-3 tokens"),
        }
    }

    /// Normalize a name to its canonical capitalization and spacing,
    /// i.e. `encode(decode(name))`.
    pub fn canonicalize(&self, name: &str) -> Result<String> {
        Ok(self.encode(self.decode(name)?))
    }

    /// Split a name into 1-3 whitespace-separated tokens.
    fn tokens<'a>(&self, name: &'a str) -> Result<Vec<&'a str>> {
        let tokens: Vec<&str> = name.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > 3 {
            return Err(Error::new(ErrorKind::InvalidFormat(name.to_string())));
        }
        Ok(tokens)
    }

    /// Check two tokens against the two words of the overflow marker.
    fn is_overflow_marker(&self, first: &str, second: &str) -> bool {
        let mut words = self.overflow.split_whitespace();
        matches!(
            (words.next(), words.next(), words.next()),
            (Some(a), Some(b), None) if eq_ci(a, first) && eq_ci(b, second)
        )
    }
}

/// Encode an identifier using the standard pool.
pub fn encode(id: u64) -> String {
    STANDARD.encode(id)
}

/// Check a name against the standard pool.
pub fn contains(name: &str) -> Result<bool> {
    STANDARD.contains(name)
}

/// Decode a name using the standard pool.
pub fn decode(name: &str) -> Result<u64> {
    STANDARD.decode(name)
}

/// Canonicalize a name using the standard pool.
pub fn canonicalize(name: &str) -> Result<String> {
    STANDARD.canonicalize(name)
}

/// Case-insensitive token lookup. Unicode-aware since the pool carries
/// "Naïve".
fn find_word(list: &[&str], token: &str) -> Option<usize> {
    let token = token.to_lowercase();
    list.iter().position(|entry| entry.to_lowercase() == token)
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// ASCII decimal digits only; the service never emits anything wider.
fn is_decimal(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}
