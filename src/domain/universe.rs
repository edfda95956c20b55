//! Instrument universe: the name registry and its exclusion rules.
//!
//! The universe is built once before any scanning starts and is shared
//! read-only by every worker afterwards.

use std::collections::{BTreeMap, HashSet};

pub const CODE_WIDTH: usize = 6;
pub const DEFAULT_EXCLUDE_PREFIXES: &str = "30,68";
pub const DEFAULT_EXCLUDE_MARKERS: &str = "ST,st,退";

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in list")]
    EmptyToken,

    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("invalid price band: min {min} must be below max {max}")]
    InvalidPriceBand { min: f64, max: f64 },
}

/// Parses a comma-separated list, trimming entries and rejecting blanks and repeats.
pub fn parse_list(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut items = Vec::new();
    let mut seen = HashSet::new();

    if input.trim().is_empty() {
        return Ok(items);
    }

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(UniverseError::DuplicateEntry(trimmed.to_string()));
        }
        items.push(trimmed.to_string());
    }

    Ok(items)
}

/// Left-pads numeric codes to the exchange width ("1" → "000001") and drops
/// any ".SZ"-style suffix.
pub fn normalize_code(raw: &str) -> String {
    let base = raw.trim().split('.').next().unwrap_or_default();
    if !base.is_empty() && base.len() < CODE_WIDTH && base.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>width$}", base, width = CODE_WIDTH)
    } else {
        base.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniverseFilter {
    /// Board prefixes that are never scanned (e.g. growth boards).
    pub exclude_prefixes: Vec<String>,
    /// Name fragments marking special treatment or delisting.
    pub exclude_markers: Vec<String>,
    /// Inclusive band for the latest close; instruments outside are skipped.
    pub price_band: Option<(f64, f64)>,
}

impl Default for UniverseFilter {
    fn default() -> Self {
        Self {
            exclude_prefixes: parse_list(DEFAULT_EXCLUDE_PREFIXES).unwrap_or_default(),
            exclude_markers: parse_list(DEFAULT_EXCLUDE_MARKERS).unwrap_or_default(),
            price_band: None,
        }
    }
}

impl UniverseFilter {
    pub fn exclusion(&self, code: &str, name: &str) -> Option<ExclusionReason> {
        if let Some(marker) = self.exclude_markers.iter().find(|m| name.contains(m.as_str())) {
            return Some(ExclusionReason::NameMarker(marker.clone()));
        }
        self.exclude_prefixes
            .iter()
            .find(|p| code.starts_with(p.as_str()))
            .map(|p| ExclusionReason::BoardPrefix(p.clone()))
    }

    pub fn in_price_band(&self, close: f64) -> bool {
        match self.price_band {
            Some((min, max)) => close >= min && close <= max,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    NameMarker(String),
    BoardPrefix(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedCode {
    pub code: String,
    pub name: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default)]
pub struct Universe {
    names: BTreeMap<String, String>,
    pub excluded: Vec<ExcludedCode>,
}

impl Universe {
    /// Builds the scannable universe from raw `(code, name)` registry rows.
    /// Later rows for the same code replace earlier ones.
    pub fn build<I>(entries: I, filter: &UniverseFilter) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut registry = BTreeMap::new();
        for (code, name) in entries {
            registry.insert(normalize_code(&code), name.trim().to_string());
        }

        let mut names = BTreeMap::new();
        let mut excluded = Vec::new();
        for (code, name) in registry {
            match filter.exclusion(&code, &name) {
                Some(reason) => excluded.push(ExcludedCode { code, name, reason }),
                None => {
                    names.insert(code, name);
                }
            }
        }

        Self { names, excluded }
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.names.contains_key(code)
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}
