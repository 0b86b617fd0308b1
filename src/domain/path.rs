//! Materialized paths and the fixed-width codec that produces them
//!
//! A path is the concatenation of one fixed-width segment per level, root
//! first. The empty path addresses the partition root, which is not a node.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Base-36 alphabet, digits before letters so that string order matches
/// ordinal order.
pub const DEFAULT_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Number of characters per path segment.
pub const DEFAULT_STEP_LENGTH: usize = 4;

/// Encoded position of a node: one segment per ancestor level including self.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterializedPath(String);

impl MaterializedPath {
    /// Wrap a raw string without validation. Use [`PathCodec::parse`] for input.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The partition root: parent of every depth-1 node.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &MaterializedPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True if this path lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &MaterializedPath) -> bool {
        self.0.len() > ancestor.0.len() && self.starts_with(ancestor)
    }

    /// Swap the leading `old` prefix for `new`. Returns `None` when `old` is
    /// not a prefix of this path.
    pub fn rebase(&self, old: &MaterializedPath, new: &MaterializedPath) -> Option<Self> {
        self.0
            .strip_prefix(old.as_str())
            .map(|rest| Self(format!("{}{}", new.0, rest)))
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Encodes ancestor ordinals into fixed-width paths and back.
///
/// All operations are pure. Ordinals start at 1 for generated paths; the
/// largest encodable ordinal is `alphabet.len() ^ step_length - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCodec {
    step_length: usize,
    alphabet: Vec<char>,
    max_ordinal: u64,
}

impl Default for PathCodec {
    fn default() -> Self {
        // The defaults are known-valid.
        Self {
            step_length: DEFAULT_STEP_LENGTH,
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            max_ordinal: 36u64.pow(DEFAULT_STEP_LENGTH as u32) - 1,
        }
    }
}

impl PathCodec {
    /// Build a codec, validating the segment width and alphabet.
    ///
    /// The alphabet must hold at least two distinct ASCII characters, and
    /// `alphabet.len() ^ step_length` must fit in a `u64`.
    pub fn new(step_length: usize, alphabet: &str) -> DomainResult<Self> {
        if step_length == 0 {
            return Err(DomainError::InvalidCodec(
                "step length must be at least 1".into(),
            ));
        }
        let chars: Vec<char> = alphabet.chars().collect();
        if chars.len() < 2 {
            return Err(DomainError::InvalidCodec(format!(
                "alphabet needs at least 2 characters, got {:?}",
                alphabet
            )));
        }
        if !chars.iter().all(|c| c.is_ascii_graphic()) {
            return Err(DomainError::InvalidCodec(format!(
                "alphabet must be printable ASCII: {:?}",
                alphabet
            )));
        }
        let mut seen = chars.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != chars.len() {
            return Err(DomainError::InvalidCodec(format!(
                "alphabet contains duplicate characters: {:?}",
                alphabet
            )));
        }
        let capacity = u32::try_from(step_length)
            .ok()
            .and_then(|exp| (chars.len() as u64).checked_pow(exp))
            .ok_or_else(|| {
                DomainError::InvalidCodec(format!(
                    "{} ^ {} does not fit in 64 bits",
                    chars.len(),
                    step_length
                ))
            })?;

        Ok(Self {
            step_length,
            alphabet: chars,
            max_ordinal: capacity - 1,
        })
    }

    pub fn step_length(&self) -> usize {
        self.step_length
    }

    pub fn max_ordinal(&self) -> u64 {
        self.max_ordinal
    }

    /// Encode an ancestor chain, root first.
    pub fn encode(&self, ordinals: &[u64]) -> DomainResult<MaterializedPath> {
        let mut out = String::with_capacity(ordinals.len() * self.step_length);
        for &ordinal in ordinals {
            out.push_str(&self.encode_segment(ordinal, &MaterializedPath::new(out.clone()))?);
        }
        Ok(MaterializedPath(out))
    }

    /// Decode a path into its ancestor ordinals, root first.
    pub fn decode(&self, path: &MaterializedPath) -> DomainResult<Vec<u64>> {
        self.check_width(path)?;
        let chars: Vec<char> = path.as_str().chars().collect();
        chars
            .chunks(self.step_length)
            .map(|segment| self.decode_segment(segment, path))
            .collect()
    }

    /// Parse and validate user input into a path.
    pub fn parse(&self, raw: &str) -> DomainResult<MaterializedPath> {
        let path = MaterializedPath::new(raw.trim());
        self.decode(&path)?;
        Ok(path)
    }

    /// Depth of the node at `path`; the root path has depth 0.
    pub fn depth_of(&self, path: &MaterializedPath) -> DomainResult<usize> {
        self.check_width(path)?;
        Ok(path.len() / self.step_length)
    }

    /// Path of the parent node, `None` for depth-1 nodes and the root.
    pub fn parent_path_of(&self, path: &MaterializedPath) -> DomainResult<Option<MaterializedPath>> {
        let depth = self.depth_of(path)?;
        if depth <= 1 {
            return Ok(None);
        }
        Ok(Some(self.ancestor_at(path, depth - 1)))
    }

    /// Path of the group a node belongs to: its parent, or the root path.
    pub fn group_path_of(&self, path: &MaterializedPath) -> DomainResult<MaterializedPath> {
        Ok(self
            .parent_path_of(path)?
            .unwrap_or_else(MaterializedPath::root))
    }

    /// Ancestor paths, root first, excluding `path` itself.
    pub fn ancestor_paths(&self, path: &MaterializedPath) -> DomainResult<Vec<MaterializedPath>> {
        let depth = self.depth_of(path)?;
        Ok((1..depth).map(|d| self.ancestor_at(path, d)).collect())
    }

    /// Ordinal of the last segment; `None` for the root path.
    pub fn last_ordinal(&self, path: &MaterializedPath) -> DomainResult<Option<u64>> {
        Ok(self.decode(path)?.last().copied())
    }

    /// Append one segment with `ordinal` below `parent`.
    pub fn child_path(&self, parent: &MaterializedPath, ordinal: u64) -> DomainResult<MaterializedPath> {
        self.check_width(parent)?;
        let segment = self.encode_segment(ordinal, parent)?;
        Ok(MaterializedPath(format!("{}{}", parent.as_str(), segment)))
    }

    fn ancestor_at(&self, path: &MaterializedPath, depth: usize) -> MaterializedPath {
        MaterializedPath(path.as_str()[..depth * self.step_length].to_string())
    }

    fn check_width(&self, path: &MaterializedPath) -> DomainResult<()> {
        if !path.as_str().is_ascii() || path.len() % self.step_length != 0 {
            return Err(DomainError::MalformedPath {
                path: path.as_str().to_string(),
                reason: format!(
                    "length {} is not a multiple of step length {}",
                    path.len(),
                    self.step_length
                ),
            });
        }
        Ok(())
    }

    fn encode_segment(&self, ordinal: u64, parent: &MaterializedPath) -> DomainResult<String> {
        if ordinal > self.max_ordinal {
            return Err(DomainError::PathOverflow {
                parent: parent.to_string(),
                max_ordinal: self.max_ordinal,
            });
        }
        let base = self.alphabet.len() as u64;
        let mut digits = vec![self.alphabet[0]; self.step_length];
        let mut rest = ordinal;
        for slot in digits.iter_mut().rev() {
            *slot = self.alphabet[(rest % base) as usize];
            rest /= base;
        }
        Ok(digits.into_iter().collect())
    }

    fn decode_segment(&self, segment: &[char], path: &MaterializedPath) -> DomainResult<u64> {
        let base = self.alphabet.len() as u64;
        segment.iter().try_fold(0u64, |acc, c| {
            let digit = self
                .alphabet
                .iter()
                .position(|a| a == c)
                .ok_or_else(|| DomainError::MalformedPath {
                    path: path.as_str().to_string(),
                    reason: format!("character {:?} is not in the path alphabet", c),
                })?;
            // Cannot overflow: the codec rejects alphabets whose capacity exceeds u64.
            Ok(acc * base + digit as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[1], "0001")]
    #[case(&[1, 2], "00010002")]
    #[case(&[36], "0010")]
    #[case(&[35, 1295], "000Z00ZZ")]
    fn test_encode(#[case] ordinals: &[u64], #[case] expected: &str) {
        let codec = PathCodec::default();
        assert_eq!(codec.encode(ordinals).unwrap().as_str(), expected);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let codec = PathCodec::default();
        let path = codec.encode(&[3, 40, 7]).unwrap();
        assert_eq!(codec.decode(&path).unwrap(), vec![3, 40, 7]);
    }

    #[rstest]
    #[case("")]
    #[case("00010002")]
    fn test_depth_consistent_with_length(#[case] raw: &str) {
        let codec = PathCodec::default();
        let path = MaterializedPath::new(raw);
        assert_eq!(codec.depth_of(&path).unwrap(), raw.len() / 4);
    }

    #[rstest]
    #[case("001")]
    #[case("00010")]
    #[case("00a1")]
    #[case("00-1")]
    fn test_malformed_paths_rejected(#[case] raw: &str) {
        let codec = PathCodec::default();
        let err = codec.decode(&MaterializedPath::new(raw)).unwrap_err();
        assert!(matches!(err, DomainError::MalformedPath { .. }), "{err:?}");
    }

    #[test]
    fn test_parent_path() {
        let codec = PathCodec::default();
        let path = MaterializedPath::new("000100020003");
        assert_eq!(
            codec.parent_path_of(&path).unwrap(),
            Some(MaterializedPath::new("00010002"))
        );
        assert_eq!(codec.parent_path_of(&MaterializedPath::new("0001")).unwrap(), None);
        assert_eq!(codec.parent_path_of(&MaterializedPath::root()).unwrap(), None);
    }

    #[test]
    fn test_ancestor_paths_root_first() {
        let codec = PathCodec::default();
        let ancestors = codec
            .ancestor_paths(&MaterializedPath::new("000100020003"))
            .unwrap();
        assert_eq!(
            ancestors,
            vec![MaterializedPath::new("0001"), MaterializedPath::new("00010002")]
        );
    }

    #[test]
    fn test_segment_overflow() {
        let codec = PathCodec::new(1, "01").unwrap();
        assert_eq!(codec.max_ordinal(), 1);
        let err = codec.child_path(&MaterializedPath::root(), 2).unwrap_err();
        assert!(matches!(err, DomainError::PathOverflow { max_ordinal: 1, .. }));
    }

    #[rstest]
    #[case(0, "01")]
    #[case(2, "0")]
    #[case(2, "aa")]
    #[case(100, "0123456789")]
    fn test_invalid_codec(#[case] step: usize, #[case] alphabet: &str) {
        assert!(matches!(
            PathCodec::new(step, alphabet),
            Err(DomainError::InvalidCodec(_))
        ));
    }

    #[test]
    fn test_rebase() {
        let path = MaterializedPath::new("000100020003");
        let rebased = path
            .rebase(&MaterializedPath::new("00010002"), &MaterializedPath::new("0005"))
            .unwrap();
        assert_eq!(rebased.as_str(), "00050003");
        assert!(path
            .rebase(&MaterializedPath::new("0002"), &MaterializedPath::root())
            .is_none());
    }
}
