use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hard ceiling on generate+review rounds for a diagram request.
pub const MAX_DIAGRAM_ITERATIONS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Specification,
    Architecture,
    Proposal,
    Sprint,
    Readme,
    Journal,
    Conference,
    Poster,
    Presentation,
    Report,
    Grant,
    Thesis,
    Preprint,
    #[default]
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocPreset {
    pub doc_type: DocType,
    pub name: &'static str,
    pub threshold: f64,
}

pub const DOC_PRESETS: &[DocPreset] = &[
    DocPreset {
        doc_type: DocType::Specification,
        name: "specification",
        threshold: 8.5,
    },
    DocPreset {
        doc_type: DocType::Architecture,
        name: "architecture",
        threshold: 8.0,
    },
    DocPreset {
        doc_type: DocType::Proposal,
        name: "proposal",
        threshold: 8.0,
    },
    DocPreset {
        doc_type: DocType::Sprint,
        name: "sprint",
        threshold: 7.5,
    },
    DocPreset {
        doc_type: DocType::Readme,
        name: "readme",
        threshold: 7.0,
    },
    DocPreset {
        doc_type: DocType::Journal,
        name: "journal",
        threshold: 8.5,
    },
    DocPreset {
        doc_type: DocType::Conference,
        name: "conference",
        threshold: 8.0,
    },
    DocPreset {
        doc_type: DocType::Poster,
        name: "poster",
        threshold: 7.0,
    },
    DocPreset {
        doc_type: DocType::Presentation,
        name: "presentation",
        threshold: 6.5,
    },
    DocPreset {
        doc_type: DocType::Report,
        name: "report",
        threshold: 7.5,
    },
    DocPreset {
        doc_type: DocType::Grant,
        name: "grant",
        threshold: 8.0,
    },
    DocPreset {
        doc_type: DocType::Thesis,
        name: "thesis",
        threshold: 8.0,
    },
    DocPreset {
        doc_type: DocType::Preprint,
        name: "preprint",
        threshold: 7.5,
    },
    DocPreset {
        doc_type: DocType::Default,
        name: "default",
        threshold: 7.5,
    },
];

impl DocType {
    pub fn preset(self) -> &'static DocPreset {
        // The table lists every variant exactly once.
        DOC_PRESETS
            .iter()
            .find(|preset| preset.doc_type == self)
            .unwrap_or(&DOC_PRESETS[DOC_PRESETS.len() - 1])
    }

    pub fn name(self) -> &'static str {
        self.preset().name
    }

    /// Minimum review score (out of 10) at which the loop stops early.
    pub fn threshold(self) -> f64 {
        self.preset().threshold
    }

    pub fn names() -> Vec<&'static str> {
        DOC_PRESETS.iter().map(|preset| preset.name).collect()
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        DOC_PRESETS
            .iter()
            .find(|preset| preset.name == normalized)
            .map(|preset| preset.doc_type)
            .ok_or_else(|| {
                format!(
                    "Unknown document type '{}'. Expected one of: {}",
                    raw.trim(),
                    DocType::names().join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{DocType, DOC_PRESETS, MAX_DIAGRAM_ITERATIONS};

    #[test]
    fn every_variant_has_exactly_one_preset() {
        let variants: HashSet<DocType> = DOC_PRESETS.iter().map(|preset| preset.doc_type).collect();
        assert_eq!(variants.len(), DOC_PRESETS.len());
        assert_eq!(DOC_PRESETS.len(), 14);
        for preset in DOC_PRESETS {
            assert_eq!(preset.doc_type.preset().name, preset.name);
        }
    }

    #[test]
    fn thresholds_stay_within_published_band() {
        for preset in DOC_PRESETS {
            assert!(
                (6.5..=8.5).contains(&preset.threshold),
                "{} threshold {} out of band",
                preset.name,
                preset.threshold
            );
        }
        assert_eq!(DocType::Specification.threshold(), 8.5);
        assert_eq!(DocType::Presentation.threshold(), 6.5);
        assert_eq!(DocType::Default.threshold(), 7.5);
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown_names() {
        assert_eq!("Architecture".parse::<DocType>(), Ok(DocType::Architecture));
        assert_eq!(" readme ".parse::<DocType>(), Ok(DocType::Readme));
        let err = "blueprint".parse::<DocType>().err().unwrap_or_default();
        assert!(err.starts_with("Unknown document type 'blueprint'"));
        assert!(err.contains("presentation"));
    }

    #[test]
    fn iteration_cap_is_two() {
        assert_eq!(MAX_DIAGRAM_ITERATIONS, 2);
    }
}
