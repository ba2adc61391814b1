//! Identifier minting for Content-ID, Message-ID and MIME boundaries
//!
//! All identifiers of one message come from a single generator so that a
//! seeded export is byte-reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::fmt;

use crate::config::ExportConfig;

/// A Content-ID in its header form, `<token@domain>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an identifier, adding angle brackets when missing
    #[must_use]
    pub fn new(id: &str) -> Self {
        let bare = id.trim().trim_start_matches('<').trim_end_matches('>');
        Self(format!("<{bare}>"))
    }

    /// Header form with angle brackets
    #[must_use]
    pub fn header_value(&self) -> &str {
        &self.0
    }

    /// `token@domain` without brackets
    #[must_use]
    pub fn bare(&self) -> &str {
        &self.0[1..self.0.len() - 1]
    }

    /// Reference form used in HTML, `cid:token@domain`
    #[must_use]
    pub fn cid_url(&self) -> String {
        format!("cid:{}", self.bare())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-message generator of unique identifiers
#[derive(Debug)]
pub struct IdGenerator {
    rng: StdRng,
    domain: String,
    issued: HashSet<String>,
}

impl IdGenerator {
    /// `seed` fixes the sequence; `None` seeds from the operating system
    #[must_use]
    pub fn new(domain: impl Into<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            domain: domain.into(),
            issued: HashSet::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.content_id_domain(), config.id_seed())
    }

    fn unique_token(&mut self, len: usize) -> String {
        loop {
            let token: String = (0..len)
                .map(|_| {
                    let digit = self.rng.random_range(0..36u32);
                    char::from_digit(digit, 36).unwrap_or('0')
                })
                .collect();
            if self.issued.insert(token.clone()) {
                return token;
            }
        }
    }

    pub fn content_id(&mut self) -> ContentId {
        let token = self.unique_token(20);
        ContentId(format!("<{token}@{}>", self.domain))
    }

    /// Message-ID header value, `<token@domain>`
    pub fn message_id(&mut self) -> String {
        let token = self.unique_token(24);
        format!("<{token}@{}>", self.domain)
    }

    /// Multipart boundary. The `=_` prefix cannot appear in quoted-printable
    /// or base64 output, so no body line can collide with it.
    pub fn boundary(&mut self) -> String {
        format!("=_{}", self.unique_token(28))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_forms() {
        let id = ContentId::new("abc@confluence-export");
        assert_eq!(id.header_value(), "<abc@confluence-export>");
        assert_eq!(id.bare(), "abc@confluence-export");
        assert_eq!(id.cid_url(), "cid:abc@confluence-export");
        assert_eq!(ContentId::new("<abc@x>"), ContentId::new("abc@x"));
    }

    #[test]
    fn test_seeded_generators_repeat() {
        let mut a = IdGenerator::new("d", Some(7));
        let mut b = IdGenerator::new("d", Some(7));
        for _ in 0..10 {
            assert_eq!(a.content_id(), b.content_id());
        }
        assert_eq!(a.boundary(), b.boundary());
        assert_eq!(a.message_id(), b.message_id());
    }

    #[test]
    fn test_identifiers_are_unique_and_well_formed() {
        let mut ids = IdGenerator::new("confluence-export", None);
        let minted: HashSet<ContentId> = (0..500).map(|_| ids.content_id()).collect();
        assert_eq!(minted.len(), 500);
        let boundary = ids.boundary();
        assert!(boundary.starts_with("=_"));
        assert!(boundary.len() <= 70, "RFC 2046 limits boundaries to 70 chars");
        assert!(ids.message_id().ends_with("@confluence-export>"));
    }
}
