//! Static code/label tables for the categorical fields of a safety work application.
//!
//! Lookups never fail: an unknown code renders as itself and an unknown label resolves to an
//! empty code, so stale or legacy values still pass through the submission path.

mod catalog;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Work-type code that activates the conditional quality-rework block.
pub const QUALITY_REWORK: &str = "quality_rework";

/// Hazard-type code for the explicit "no hazards" selection.
pub const NO_HAZARD: &str = "none";

/// Single-level option sets. Work content is scoped by work type and has its own lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    WorkLocation,
    WorkType,
    HazardType,
    WorkBasis,
}

impl OptionKind {
    pub const ALL: [OptionKind; 4] = [
        OptionKind::WorkLocation,
        OptionKind::WorkType,
        OptionKind::HazardType,
        OptionKind::WorkBasis,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            OptionKind::WorkLocation => "work_location",
            OptionKind::WorkType => "work_type",
            OptionKind::HazardType => "hazard_type",
            OptionKind::WorkBasis => "work_basis",
        }
    }
}

/// One value/label pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub value: String,
    pub label: String,
}

impl OptionEntry {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// The five option sets, in the shape served to form clients and accepted from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCatalog {
    pub work_locations: Vec<OptionEntry>,
    pub work_types: Vec<OptionEntry>,
    /// Work-type code to the content options valid for that type.
    pub work_contents: BTreeMap<String, Vec<OptionEntry>>,
    pub hazard_types: Vec<OptionEntry>,
    pub work_bases: Vec<OptionEntry>,
}

/// Errors raised while loading a replacement catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unable to read option catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("option catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("option set {set} repeats the {field} '{entry}'")]
    Duplicate {
        set: String,
        field: &'static str,
        entry: String,
    },
}

/// Immutable lookup tables built from an [`OptionCatalog`].
#[derive(Debug, Clone)]
pub struct OptionRegistry {
    catalog: OptionCatalog,
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl OptionRegistry {
    /// Registry backed by the built-in catalog.
    pub fn standard() -> Self {
        Self {
            catalog: catalog::standard_catalog(),
        }
    }

    /// Build a registry, rejecting sets whose values or labels repeat (either would break
    /// the code/label round trip).
    pub fn from_catalog(catalog: OptionCatalog) -> Result<Self, CatalogError> {
        for kind in OptionKind::ALL {
            ensure_unique(kind.label(), entries_for(&catalog, kind))?;
        }
        for (work_type, entries) in &catalog.work_contents {
            ensure_unique(&format!("work_content[{work_type}]"), entries)?;
        }

        Ok(Self { catalog })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        let catalog: OptionCatalog = serde_json::from_str(&raw)?;
        Self::from_catalog(catalog)
    }

    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }

    pub fn options(&self, kind: OptionKind) -> &[OptionEntry] {
        entries_for(&self.catalog, kind)
    }

    /// Content options for a work type; unknown work types have none.
    pub fn work_content_options(&self, work_type: &str) -> &[OptionEntry] {
        self.catalog
            .work_contents
            .get(work_type.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display label for a code, or the code itself when it is not defined.
    pub fn label_of<'a>(&'a self, kind: OptionKind, code: &'a str) -> &'a str {
        label_in(self.options(kind), code)
    }

    /// Code for a display label, or an empty string when no option carries that label.
    pub fn code_of(&self, kind: OptionKind, label: &str) -> &str {
        code_in(self.options(kind), label)
    }

    pub fn work_content_label_of<'a>(&'a self, work_type: &str, code: &'a str) -> &'a str {
        label_in(self.work_content_options(work_type), code)
    }

    pub fn work_content_code_of(&self, work_type: &str, label: &str) -> &str {
        code_in(self.work_content_options(work_type), label)
    }

    pub fn is_defined(&self, kind: OptionKind, code: &str) -> bool {
        let code = code.trim();
        self.options(kind).iter().any(|entry| entry.value == code)
    }
}

fn entries_for(catalog: &OptionCatalog, kind: OptionKind) -> &[OptionEntry] {
    match kind {
        OptionKind::WorkLocation => &catalog.work_locations,
        OptionKind::WorkType => &catalog.work_types,
        OptionKind::HazardType => &catalog.hazard_types,
        OptionKind::WorkBasis => &catalog.work_bases,
    }
}

fn label_in<'a>(entries: &'a [OptionEntry], code: &'a str) -> &'a str {
    let code = code.trim();
    entries
        .iter()
        .find(|entry| entry.value == code)
        .map(|entry| entry.label.as_str())
        .unwrap_or(code)
}

fn code_in<'a>(entries: &'a [OptionEntry], label: &str) -> &'a str {
    let label = label.trim();
    entries
        .iter()
        .find(|entry| entry.label == label)
        .map(|entry| entry.value.as_str())
        .unwrap_or("")
}

fn ensure_unique(set: &str, entries: &[OptionEntry]) -> Result<(), CatalogError> {
    let mut values = HashSet::new();
    let mut labels = HashSet::new();
    for entry in entries {
        if !values.insert(entry.value.as_str()) {
            return Err(CatalogError::Duplicate {
                set: set.to_string(),
                field: "value",
                entry: entry.value.clone(),
            });
        }
        if !labels.insert(entry.label.as_str()) {
            return Err(CatalogError::Duplicate {
                set: set.to_string(),
                field: "label",
                entry: entry.label.clone(),
            });
        }
    }
    Ok(())
}
