//! Locations of externally resolved dependencies.
//!
//! A pinned dependency tree (say, a vendored module at a tag) is unpacked
//! into a directory derived from a hash of what was pinned, so two different
//! pins of the same prefix never share a directory.

use crate::unit::identity_path;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// Directory under `root` for the dependency tree pinned by
/// `prefix`, `kind` and `value`: `<root>/<first hash byte>/<rest of hash>`.
pub fn cache_dir(root: &Path, prefix: &str, kind: &str, value: &str) -> PathBuf {
    let mut hasher = Sha1::new();
    hasher.update(prefix.as_bytes());
    hasher.update(kind.as_bytes());
    hasher.update(b"=");
    hasher.update(value.as_bytes());
    let hash = hasher.finalize();
    root.join(hex::encode(&hash[..1]))
        .join(hex::encode(&hash[1..]))
}

/// One resolver: identities under `prefix` come from the tree pinned at
/// `kind=value` (for example `tag=v1.2.0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub prefix: String,
    pub kind: String,
    pub value: String,
}

impl Pin {
    pub fn new(
        prefix: impl Into<String>,
        kind: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Pin {
            prefix: prefix.into(),
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Whether `identity` is `prefix` or lies under it, on whole segments.
    fn matches(&self, identity: &str) -> bool {
        match identity.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// An ordered list of pins.  When several pins match an identity the one
/// with the longest prefix wins; among equally long prefixes, the first
/// registered.
#[derive(Debug)]
pub struct Registry {
    root: PathBuf,
    pins: Vec<Pin>,
}

impl Registry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Registry {
            root: root.into(),
            pins: Vec::new(),
        }
    }

    pub fn register(&mut self, pin: Pin) {
        self.pins.push(pin);
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// The pin responsible for `identity`, if any.
    pub fn pin_for(&self, identity: &str) -> Option<&Pin> {
        let mut best: Option<&Pin> = None;
        for pin in self.pins.iter().filter(|p| p.matches(identity)) {
            // Strictly longer only, so the earlier pin keeps ties.
            if best.map_or(true, |b| pin.prefix.len() > b.prefix.len()) {
                best = Some(pin);
            }
        }
        best
    }

    /// Source directory of `identity` inside its pinned tree.
    pub fn resolve(&self, identity: &str) -> Option<PathBuf> {
        let pin = self.pin_for(identity)?;
        let dir = cache_dir(&self.root, &pin.prefix, &pin.kind, &pin.value);
        Some(dir.join(identity_path(identity)))
    }
}
