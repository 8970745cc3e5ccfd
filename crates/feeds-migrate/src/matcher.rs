//! Matching of legacy mapping keys against current field vocabularies.
//!
//! Legacy mapping keys are either bare field names or serialized arrays
//! describing a path into the legacy item, e.g.
//! `a:2:{i:0;s:7:"options";i:1;s:4:"tags";}` for `options → tags`.
//! [`FieldPath`] decodes both forms; [`FieldMatcher`] resolves the decoded
//! leaf against the fields a parser or processor exposes.

use std::collections::HashMap;

use tracing::trace;

use crate::error::{Error, Result};

/// Decoded legacy field identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Decodes a legacy key.
    ///
    /// Serialized arrays yield their values in order (nested arrays are
    /// flattened, keys dropped); a serialized scalar yields one segment.
    /// Anything that is not fully valid serialized data, or an empty array,
    /// is kept verbatim as a single segment.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        let mut decoder = Decoder { input: raw, pos: 0 };
        let mut segments = Vec::new();
        let decoded = decoder.value(&mut segments).is_some() && decoder.pos == raw.len();
        if decoded && !segments.is_empty() {
            Self { segments }
        } else {
            Self {
                segments: vec![raw.to_string()],
            }
        }
    }

    /// All segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Bare field name: the last segment.
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Whether the key described more than a bare field.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        self.segments.len() > 1
    }
}

struct Decoder<'a> {
    input: &'a str,
    pos: usize,
}

impl Decoder<'_> {
    fn value(&mut self, out: &mut Vec<String>) -> Option<()> {
        match self.input.as_bytes().get(self.pos)? {
            b's' => {
                let s = self.string()?;
                out.push(s);
            }
            b'i' | b'd' | b'b' => {
                self.pos += 1;
                self.expect(":")?;
                let token = self.until(';')?;
                if token.is_empty() {
                    return None;
                }
                out.push(token.to_string());
            }
            b'N' => self.expect("N;")?,
            b'a' => {
                self.expect("a:")?;
                let count: usize = self.until(':')?.parse().ok()?;
                self.expect("{")?;
                for _ in 0..count {
                    self.key()?;
                    self.value(out)?;
                }
                self.expect("}")?;
            }
            _ => return None,
        }
        Some(())
    }

    fn key(&mut self) -> Option<()> {
        match self.input.as_bytes().get(self.pos)? {
            b's' => self.string().map(|_| ()),
            b'i' => {
                self.expect("i:")?;
                self.until(';')?.parse::<i64>().ok().map(|_| ())
            }
            _ => None,
        }
    }

    /// `s:<byte length>:"<bytes>";`
    fn string(&mut self) -> Option<String> {
        self.expect("s:")?;
        let len: usize = self.until(':')?.parse().ok()?;
        self.expect("\"")?;
        let end = self.pos.checked_add(len)?;
        let s = self.input.get(self.pos..end)?.to_string();
        self.pos = end;
        self.expect("\";")?;
        Some(s)
    }

    fn expect(&mut self, token: &str) -> Option<()> {
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            Some(())
        } else {
            None
        }
    }

    /// Consumes up to and including `delimiter`, returning what preceded it.
    fn until(&mut self, delimiter: char) -> Option<&str> {
        let rest = &self.input[self.pos..];
        let offset = rest.find(delimiter)?;
        self.pos += offset + delimiter.len_utf8();
        Some(&rest[..offset])
    }
}

/// Resolves legacy mapping keys to current field ids.
#[derive(Debug, Clone, Default)]
pub struct FieldMatcher {
    overrides: HashMap<String, String>,
}

impl FieldMatcher {
    /// Creates a matcher without overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an exact override for a raw legacy key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either key is empty.
    pub fn extend(&mut self, legacy_key: &str, current_key: &str) -> Result<()> {
        if legacy_key.is_empty() || current_key.is_empty() {
            return Err(Error::Config(format!(
                "field lookup needs both keys, got '{legacy_key}' => '{current_key}'"
            )));
        }
        self.overrides
            .insert(legacy_key.to_string(), current_key.to_string());
        Ok(())
    }

    /// Number of registered overrides.
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Finds the current field for `legacy_key`.
    ///
    /// An override registered for the raw key wins. Otherwise the first
    /// vocabulary entry containing the decoded leaf name is returned; this
    /// is deliberately loose so `tags` finds `field_tags`.
    #[must_use]
    pub fn match_field(&self, legacy_key: &str, vocabulary: &[String]) -> Option<String> {
        if let Some(current) = self.overrides.get(legacy_key) {
            return Some(current.clone());
        }

        let path = FieldPath::decode(legacy_key);
        let leaf = path.leaf();
        if leaf.is_empty() {
            return None;
        }
        let found = vocabulary.iter().find(|name| name.contains(leaf)).cloned();
        trace!(legacy_key, leaf, ?found, "heuristic field match");
        found
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
