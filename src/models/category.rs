use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized category name used for matching.
///
/// Matching is case-insensitive and ignores surrounding whitespace and runs
/// of internal whitespace: `"  Eating   Out "` and `"eating out"` are the
/// same category.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CategoryKey(String);

impl CategoryKey {
    pub fn new(raw: &str) -> Self {
        Self(tidy(raw).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trim and collapse whitespace, keeping the original casing.
pub fn tidy(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Housing",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Education",
    "Other",
];

/// The fixed list of budget categories offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCatalog {
    names: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().copied())
    }
}

impl CategoryCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = std::collections::HashSet::new();
        let names = names
            .into_iter()
            .map(|n| tidy(n.as_ref()))
            .filter(|n| !n.is_empty() && seen.insert(CategoryKey::new(n)))
            .collect();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Catalog spelling for a free-text name, if it names a catalog entry.
    pub fn canonical(&self, raw: &str) -> Option<&str> {
        let key = CategoryKey::new(raw);
        self.names
            .iter()
            .find(|n| CategoryKey::new(n) == key)
            .map(String::as_str)
    }

    /// Catalog spelling when known, otherwise the tidied input.
    pub fn resolve(&self, raw: &str) -> String {
        self.canonical(raw)
            .map(str::to_string)
            .unwrap_or_else(|| tidy(raw))
    }
}
