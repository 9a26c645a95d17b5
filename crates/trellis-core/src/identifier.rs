//! Cell identifiers backed by a process-wide string interner.
//!
//! [`Id`] is `Copy` and compares by symbol, so cells, states, change records
//! and connection indices can all key on it without cloning strings.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Stable, unique identifier of a cell.
///
/// # Examples
///
/// ```
/// use trellis_core::identifier::Id;
///
/// let a = Id::new("a");
/// assert_eq!(a, "a");
/// assert_eq!(Id::anonymous(3), "__3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Interns `name` and returns its identifier.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }

    /// Generated identifier for cells created without an explicit id.
    pub fn anonymous(idx: usize) -> Self {
        Self::new(&format!("__{idx}"))
    }

    /// Returns an owned copy of the identifier text.
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = interner();
        let text = guard.resolve(self.0).unwrap_or_default();
        f.write_str(text)
    }
}

impl std::str::FromStr for Id {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        interner().resolve(self.0) == Some(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::new(&text))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_new_interns() {
        let id1 = Id::new("node");
        let id2 = Id::new("node");
        let id3 = Id::new("edge");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
        assert_eq!(id1, "node");
    }

    #[test]
    fn test_anonymous() {
        assert_eq!(Id::anonymous(0), Id::anonymous(0));
        assert_ne!(Id::anonymous(0), Id::anonymous(1));
        assert_eq!(Id::anonymous(12), "__12");
    }

    #[test]
    fn test_display_and_from_str() {
        let id: Id = "display_test".parse().expect("infallible");
        assert_eq!(format!("{id}"), "display_test");
        assert_eq!(id.as_string(), "display_test");
    }

    #[test]
    fn test_hash_key() {
        let mut map = HashMap::new();
        map.insert(Id::new("key1"), 1);
        map.insert(Id::new("key2"), 2);

        assert_eq!(map.get(&Id::new("key1")), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_serde_as_string() {
        let id = Id::new("serialized");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"serialized\"");

        let back: Id = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
