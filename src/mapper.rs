use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::aliases::{AliasRegistry, StandardField};

pub const EXACT_MATCH: u8 = 100;
pub const PARTIAL_MATCH: u8 = 80;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s._-]+").unwrap());
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_]").unwrap());

/// Lowercase, collapse whitespace/dots/dashes/underscores to `_`, drop everything else.
pub fn normalize_column_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let collapsed = SEPARATORS.replace_all(&lowered, "_");
    NON_WORD.replace_all(&collapsed, "").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMatch {
    pub field: StandardField,
    pub confidence: u8,
}

/// Match one raw column name against the registry: exact spelling first, then substring.
pub fn match_column(raw: &str, registry: &AliasRegistry) -> Option<FieldMatch> {
    let normalized = normalize_column_name(raw);
    if normalized.is_empty() {
        return None;
    }

    for (field, aliases) in registry.entries() {
        if aliases.iter().any(|a| *a == normalized) {
            return Some(FieldMatch {
                field,
                confidence: EXACT_MATCH,
            });
        }
    }

    for (field, aliases) in registry.entries() {
        if aliases
            .iter()
            .any(|a| normalized.contains(a.as_str()) || a.contains(normalized.as_str()))
        {
            return Some(FieldMatch {
                field,
                confidence: PARTIAL_MATCH,
            });
        }
    }

    None
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MappingTarget {
    Standard(StandardField),
    /// Pass-through uploads keep the original column name as their own target.
    Verbatim(String),
}

impl std::fmt::Display for MappingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard(field) => write!(f, "{field}"),
            Self::Verbatim(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedColumn {
    pub column: String,
    pub standard: MappingTarget,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub mapping: Vec<MappedColumn>,
    pub unmapped: Vec<String>,
    pub min_confidence: u8,
}

impl ColumnMapping {
    /// Every column mapped to itself at full confidence.
    pub fn passthrough(headers: &[String]) -> Self {
        Self {
            mapping: headers
                .iter()
                .map(|h| MappedColumn {
                    column: h.clone(),
                    standard: MappingTarget::Verbatim(h.clone()),
                    confidence: EXACT_MATCH,
                })
                .collect(),
            unmapped: Vec::new(),
            min_confidence: EXACT_MATCH,
        }
    }

    pub fn standard_fields(&self) -> BTreeSet<StandardField> {
        self.mapping
            .iter()
            .filter_map(|m| match m.standard {
                MappingTarget::Standard(field) => Some(field),
                MappingTarget::Verbatim(_) => None,
            })
            .collect()
    }

    /// First original column mapped to `field`.
    pub fn column_for(&self, field: StandardField) -> Option<&str> {
        self.mapping
            .iter()
            .find(|m| m.standard == MappingTarget::Standard(field))
            .map(|m| m.column.as_str())
    }
}

/// Map every header onto the canonical schema. Overall confidence is the minimum
/// over mapped columns, or 0 when nothing mapped.
pub fn analyze_columns(headers: &[String], registry: &AliasRegistry) -> ColumnMapping {
    let mut mapping = Vec::new();
    let mut unmapped = Vec::new();

    for header in headers {
        match match_column(header, registry) {
            Some(m) => {
                tracing::debug!(column = %header, field = %m.field, confidence = m.confidence, "column matched");
                mapping.push(MappedColumn {
                    column: header.clone(),
                    standard: MappingTarget::Standard(m.field),
                    confidence: m.confidence,
                });
            }
            None => unmapped.push(header.clone()),
        }
    }

    let min_confidence = mapping.iter().map(|m| m.confidence).min().unwrap_or(0);
    tracing::info!(
        mapped = mapping.len(),
        unmapped = unmapped.len(),
        min_confidence,
        "column mapping analyzed"
    );

    ColumnMapping {
        mapping,
        unmapped,
        min_confidence,
    }
}
