use regex::{Regex, RegexBuilder};

use super::models::normalize_field;

/// Canonical commodity -> accepted aliases
pub const CROP_ALIASES: &[(&str, &str)] = &[
    ("rice", "rice|paddy"),
    ("wheat", "wheat"),
    ("maize", "maize|corn"),
    ("cotton", "cotton"),
    ("sugarcane", "sugarcane"),
    ("potato", "potato"),
];

struct AliasEntry {
    canonical: String,
    pattern: Regex,
}

/// Maps upstream commodity spellings ("Paddy(Dhan)(Common)", "Maize ") onto one
/// canonical name. Matching is a case-insensitive regex search, not equality, since
/// upstream names carry variety and grade suffixes.
pub struct CommodityNormalizer {
    aliases: Vec<AliasEntry>,
}

impl Default for CommodityNormalizer {
    fn default() -> Self {
        // Built-in table is known to compile
        Self::new(CROP_ALIASES).unwrap_or(Self { aliases: Vec::new() })
    }
}

impl CommodityNormalizer {
    pub fn new(table: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let aliases = table
            .iter()
            .map(|(canonical, pattern)| {
                Ok(AliasEntry {
                    canonical: normalize_field(canonical),
                    pattern: case_insensitive(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { aliases })
    }

    /// Canonical name for `raw`; unknown names pass through lowercased and trimmed.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = normalize_field(raw);
        self.aliases
            .iter()
            .find(|entry| entry.pattern.is_match(&cleaned))
            .map(|entry| entry.canonical.clone())
            .unwrap_or(cleaned)
    }

    /// Matcher a record's commodity must satisfy to count for `commodity`.
    pub fn matcher(&self, commodity: &str) -> CommodityMatcher {
        let canonical = self.normalize(commodity);
        match self.aliases.iter().find(|entry| entry.canonical == canonical) {
            Some(entry) => CommodityMatcher::Alias(entry.pattern.clone()),
            None => CommodityMatcher::Literal(canonical),
        }
    }
}

/// Alias pattern for known commodities, plain substring search otherwise
#[derive(Debug, Clone)]
pub enum CommodityMatcher {
    Alias(Regex),
    Literal(String),
}

impl CommodityMatcher {
    pub fn is_match(&self, reported: &str) -> bool {
        match self {
            CommodityMatcher::Alias(pattern) => pattern.is_match(reported),
            CommodityMatcher::Literal(name) => normalize_field(reported).contains(name.as_str()),
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
