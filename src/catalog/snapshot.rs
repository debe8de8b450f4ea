/*!
 * Catalog snapshot and its JSON document form.
 */

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::CatalogError;
use crate::pronoun_set::PronounSet;

/// Source label of the snapshot used when nothing could be loaded
pub const ERROR_SOURCE: &str = "Internal error loading file";

/// A wholesale copy of the remote catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    /// Who produced the catalog
    pub source: String,
    /// When the remote last changed it
    pub updated_at: DateTime<Utc>,
    /// Known pronoun sets
    pub sets: BTreeSet<PronounSet>,
}

/// `updatedAt` is accepted as RFC 3339 text or epoch milliseconds
fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(ms) = value.as_i64() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    value
        .as_str()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    source: String,
    #[serde(default, rename = "updatedAt")]
    updated_at: Option<serde_json::Value>,
    sets: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    source: &'a str,
    #[serde(rename = "updatedAt")]
    updated_at: String,
    sets: Vec<String>,
}

impl CatalogSnapshot {
    /// Empty snapshot marking a failed load
    pub fn fallback() -> Self {
        Self {
            source: ERROR_SOURCE.to_string(),
            updated_at: Utc::now(),
            sets: BTreeSet::new(),
        }
    }

    /// Whether this is the error-marker snapshot
    pub fn is_fallback(&self) -> bool {
        self.source == ERROR_SOURCE && self.sets.is_empty()
    }

    /// Parse a catalog document
    ///
    /// The document itself must be well formed, but a malformed entry in
    /// `sets` is skipped on its own.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(text)?;

        let updated_at = match document.updated_at.as_ref().and_then(parse_timestamp) {
            Some(updated_at) => updated_at,
            None => {
                debug!("Catalog document has no usable updatedAt, using load time");
                Utc::now()
            }
        };

        let mut sets = BTreeSet::new();
        for entry in document.sets {
            match entry.as_str().map(PronounSet::parse) {
                Some(Ok(set)) => {
                    sets.insert(set);
                }
                Some(Err(e)) => warn!("Skipping catalog entry {}: {}", entry, e),
                None => warn!("Skipping non-string catalog entry {}", entry),
            }
        }

        Ok(Self {
            source: document.source,
            updated_at,
            sets,
        })
    }

    /// Render as a catalog document
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let document = CatalogDocumentRef {
            source: &self.source,
            updated_at: self.updated_at.to_rfc3339(),
            sets: self.sets.iter().map(PronounSet::to_string).collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}
