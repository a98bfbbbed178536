//! Research Taxonomy
//!
//! The closed 3x3 grid of research sections and subsections. The three
//! sections are fixed; subsection labels are configuration, so call sites
//! share one parameterizable taxonomy instead of re-declaring their own.

use conviction_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// The three research sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Understanding,
    Risks,
    Valuation,
}

impl Section {
    /// All sections, in display order
    pub const ALL: [Section; 3] = [Section::Understanding, Section::Risks, Section::Valuation];

    /// Convert to the string representation used on the wire and in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Understanding => "understanding",
            Section::Risks => "risks",
            Section::Valuation => "valuation",
        }
    }

    /// Parse from the string representation
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s {
            "understanding" => Ok(Section::Understanding),
            "risks" => Ok(Section::Risks),
            "valuation" => Ok(Section::Valuation),
            _ => Err(CoreError::validation(format!("Invalid section: {}", s))),
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved (section, subsection) cell of the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellKey {
    pub section: Section,
    pub subsection: String,
}

/// The configured 3x3 grid of subsection labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    understanding: Vec<String>,
    risks: Vec<String>,
    valuation: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            understanding: labels(&["business_model", "products", "competition"]),
            risks: labels(&["market_risks", "company_risks", "external_risks"]),
            valuation: labels(&["key_metrics", "peer_comparison", "growth_outlook"]),
        }
    }
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Taxonomy {
    /// Subsection labels for one section
    pub fn subsections(&self, section: Section) -> &[String] {
        match section {
            Section::Understanding => &self.understanding,
            Section::Risks => &self.risks,
            Section::Valuation => &self.valuation,
        }
    }

    /// Iterate all nine (section, subsection) cells in grid order
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        Section::ALL.iter().flat_map(move |&section| {
            self.subsections(section).iter().map(move |sub| CellKey {
                section,
                subsection: sub.clone(),
            })
        })
    }

    /// Validate a classifier label pair against the grid.
    ///
    /// Returns `None` for unknown labels; callers drop the classification
    /// rather than inventing cells.
    pub fn resolve(&self, category: &str, subcategory: &str) -> Option<CellKey> {
        let section = Section::parse(category).ok()?;
        self.subsections(section)
            .iter()
            .find(|s| s.as_str() == subcategory)
            .map(|s| CellKey {
                section,
                subsection: s.clone(),
            })
    }
}
