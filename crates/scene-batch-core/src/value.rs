//! Chained task results
//!
//! Provides [`ChainValue`], the value threaded from one task to the next
//! while a file is processed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Result handed from one task to the next
///
/// The first task of every file receives [`ChainValue::Path`] holding the
/// file being processed. Tasks that cannot use the variant they receive
/// should fall back to their own default input instead of failing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ChainValue {
    /// A file system path
    Path(PathBuf),

    /// Structured data produced by a task
    Record(serde_json::Map<String, serde_json::Value>),

    /// No usable result
    #[default]
    Unit,
}

impl ChainValue {
    /// Create a path value
    #[inline]
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Borrow the path, if this is a path value
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Borrow the record, if this is a record value
    #[inline]
    #[must_use]
    pub fn as_record(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Consume into a path, if this is a path value
    #[inline]
    #[must_use]
    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Check for [`ChainValue::Unit`]
    #[inline]
    #[must_use]
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Variant name, for logging
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Record(_) => "record",
            Self::Unit => "unit",
        }
    }
}

impl From<PathBuf> for ChainValue {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ChainValue {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl fmt::Display for ChainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Record(record) => write!(f, "{}", serde_json::Value::Object(record.clone())),
            Self::Unit => f.write_str("()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unit() {
        assert!(ChainValue::default().is_unit());
    }

    #[test]
    fn path_accessors() {
        let value = ChainValue::path("scenes/a.ma");
        assert_eq!(value.as_path(), Some(Path::new("scenes/a.ma")));
        assert!(value.as_record().is_none());
        assert_eq!(value.variant_name(), "path");
        assert_eq!(value.into_path(), Some(PathBuf::from("scenes/a.ma")));
    }

    #[test]
    fn record_is_not_a_path() {
        let mut record = serde_json::Map::new();
        record.insert("frames".to_string(), serde_json::json!(24));
        let value = ChainValue::Record(record);

        assert!(value.as_path().is_none());
        assert_eq!(value.as_record().map(|r| r.len()), Some(1));
        assert_eq!(value.to_string(), r#"{"frames":24}"#);
    }

    #[test]
    fn serializes_with_tag() {
        let json = serde_json::to_value(ChainValue::path("a.ma")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "path", "value": "a.ma"}));
    }
}
