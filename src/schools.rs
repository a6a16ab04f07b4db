//! School resolver - maps free-text school names to knowledge-base partitions.
//!
//! Each supported school has a curated list of spelling variants. Matching
//! is case-insensitive (Unicode-aware, so Turkish İ/ı fold correctly) and
//! the first matching alias group wins. Unrecognized input falls back to
//! the general partition instead of failing, so retrieval degrades to a
//! generic knowledge base rather than blocking the session.

use serde::{Deserialize, Serialize};

/// Canonical code of the fallback partition. Sessions resolved to this
/// code skip the provisioning check at login.
pub const GENERAL_CODE: &str = "general";

/// Resolved identity of a school: which knowledge-base collection and
/// search index its retrieval queries go to. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolContext {
    /// Canonical school code (e.g. "ytu")
    pub code: String,
    /// Knowledge-base collection holding the school's documents
    pub collection: String,
    /// Vector search index name for that collection
    pub index: String,
}

impl SchoolContext {
    /// The generic/default partition used for unrecognized schools.
    pub fn general() -> Self {
        Self {
            code: GENERAL_CODE.to_string(),
            collection: "general".to_string(),
            index: "default".to_string(),
        }
    }

    /// Whether this is the fallback context.
    pub fn is_general(&self) -> bool {
        self.code == GENERAL_CODE
    }
}

/// One alias group: every spelling in `variants` resolves to the same
/// partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasGroup {
    pub code: String,
    pub collection: String,
    pub index: String,
    pub variants: Vec<String>,
}

/// Static table of alias groups, read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasTable {
    pub groups: Vec<AliasGroup>,
}

impl AliasTable {
    /// Built-in table covering the provisioned schools.
    pub fn builtin() -> Self {
        let group = |code: &str, collection: &str, index: &str, variants: &[&str]| AliasGroup {
            code: code.to_string(),
            collection: collection.to_string(),
            index: index.to_string(),
            variants: variants.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            groups: vec![
                group(
                    "ytu",
                    "ytüadvanced",
                    "default",
                    &[
                        "YTÜ",
                        "YTU",
                        "Yıldız Teknik Üniversitesi",
                        "Yildiz Teknik Universitesi",
                        "Yıldız Teknik",
                        "Yildiz",
                    ],
                ),
                group(
                    "boun",
                    "boun",
                    "boun_search",
                    &[
                        "BOUN",
                        "BOÜN",
                        "Boğaziçi",
                        "Bogazici",
                        "Boğaziçi Üniversitesi",
                        "Bogazici Universitesi",
                    ],
                ),
                group(
                    "iuc",
                    "iuc",
                    "iuc_search",
                    &[
                        "İÜC",
                        "IUC",
                        "Cerrahpaşa",
                        "Cerrahpasa",
                        "İstanbul Üniversitesi-Cerrahpaşa",
                        "Istanbul Universitesi Cerrahpasa",
                    ],
                ),
            ],
        }
    }

    /// Resolve a raw school name to its partition. Never fails: unmatched
    /// input maps to the general context.
    pub fn resolve(&self, raw: &str) -> SchoolContext {
        let needle = fold(raw);

        for group in &self.groups {
            if group.variants.iter().any(|v| fold(v) == needle) {
                return SchoolContext {
                    code: group.code.clone(),
                    collection: group.collection.clone(),
                    index: group.index.clone(),
                };
            }
        }

        SchoolContext::general()
    }
}

/// Case fold for matching. `İ` (U+0130) lowercases to `i` plus a combining
/// dot above; stripping U+0307 makes dotted and dotless spellings compare
/// equal regardless of the writer's keyboard layout.
fn fold(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|&c| c != '\u{0307}')
        .collect()
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}
