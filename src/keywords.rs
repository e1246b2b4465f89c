//! Keyword set derivation
//!
//! Turns categorized PIR output (or the LLM's comma-separated keyword
//! reply) into a flat, lowercase term set used for relevance filtering.
//! This stage never fails: empty input degrades to a fixed fallback set
//! so every collection agent always has something to match against.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Generic terms substituted when no usable keywords were supplied.
const FALLBACK_TERMS: [&str; 3] = ["threat", "vulnerability", "malware"];

/// A normalized, deduplicated set of lowercase search terms.
///
/// Invariant: never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    terms: BTreeSet<String>,
}

impl KeywordSet {
    /// The fixed generic fallback set.
    pub fn fallback() -> Self {
        Self {
            terms: FALLBACK_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Build from arbitrary terms; trims, lowercases, drops empties.
    /// An empty result yields the fallback set.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: BTreeSet<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        if terms.is_empty() {
            Self::fallback()
        } else {
            Self { terms }
        }
    }

    /// Flatten a `category -> [terms]` mapping, discarding category
    /// identity. Absent or empty input yields the fallback set.
    pub fn from_categories(categories: Option<&BTreeMap<String, Vec<String>>>) -> Self {
        match categories {
            Some(map) => Self::from_terms(map.values().flatten()),
            None => Self::fallback(),
        }
    }

    /// Parse the comma-separated keyword string an LLM returns for
    /// "extract searchable keywords from these PIRs".
    pub fn from_comma_list(list: &str) -> Self {
        Self::from_terms(list.split(','))
    }

    /// Case-insensitive substring containment of any term.
    pub fn matches(&self, haystack: &str) -> bool {
        let haystack = haystack.to_lowercase();
        self.terms.iter().any(|term| haystack.contains(term.as_str()))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.terms.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(terms: &[&str]) -> BTreeSet<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn absent_categories_yield_fallback() {
        let ks = KeywordSet::from_categories(None);
        assert_eq!(ks.terms, set_of(&["threat", "vulnerability", "malware"]));
    }

    #[test]
    fn empty_categories_yield_fallback() {
        let map = BTreeMap::new();
        let ks = KeywordSet::from_categories(Some(&map));
        assert_eq!(ks.terms, set_of(&["threat", "vulnerability", "malware"]));
    }

    #[test]
    fn categories_with_only_blank_terms_yield_fallback() {
        let mut map = BTreeMap::new();
        map.insert("technologies".to_string(), vec!["  ".to_string(), String::new()]);
        let ks = KeywordSet::from_categories(Some(&map));
        assert_eq!(ks.terms, set_of(&["threat", "vulnerability", "malware"]));
    }

    #[test]
    fn flattening_discards_categories_and_normalizes() {
        let mut map = BTreeMap::new();
        map.insert(
            "technologies".to_string(),
            vec!["AWS ".to_string(), "Kubernetes".to_string()],
        );
        map.insert("geographies".to_string(), vec!["Singapore".to_string()]);
        let ks = KeywordSet::from_categories(Some(&map));
        assert_eq!(ks.terms, set_of(&["aws", "kubernetes", "singapore"]));
    }

    #[test]
    fn comma_list_parses_and_deduplicates() {
        let ks = KeywordSet::from_comma_list("AWS, kubernetes , aws,, phishing");
        assert_eq!(ks.terms, set_of(&["aws", "kubernetes", "phishing"]));
    }

    #[test]
    fn empty_comma_list_yields_fallback() {
        let ks = KeywordSet::from_comma_list(" , ,");
        assert_eq!(ks.terms, set_of(&["threat", "vulnerability", "malware"]));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let ks = KeywordSet::from_terms(["aws", "kubernetes"]);
        assert!(ks.matches("Critical flaw in AWS Lambda runtime"));
        assert!(ks.matches("KUBERNETES cluster compromise"));
        assert!(!ks.matches("unrelated product X"));
    }
}
