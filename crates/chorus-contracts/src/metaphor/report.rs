use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::framework::Framework;

pub const FRAMEWORK_REPORT_FILE: &str = "framework_report.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkOverview {
    pub name: String,
    pub core_metaphor: String,
    pub elements: Vec<String>,
    pub mappings: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkStats {
    pub total_elements: usize,
    pub total_mappings: usize,
    pub concepts_analyzed: usize,
}

/// Elements of the framework whose meanings a concept touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptCoverage {
    pub concept: String,
    pub matched_elements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkReport {
    pub framework: FrameworkOverview,
    pub analysis: FrameworkStats,
    pub concepts: Vec<ConceptCoverage>,
}

impl FrameworkReport {
    pub fn new<S: AsRef<str>>(framework: &Framework, concepts: &[S]) -> Self {
        let concepts: Vec<ConceptCoverage> = concepts
            .iter()
            .map(|concept| ConceptCoverage {
                concept: concept.as_ref().to_string(),
                matched_elements: framework
                    .matching_elements(concept.as_ref())
                    .into_iter()
                    .map(|(element, _)| element.to_string())
                    .collect(),
            })
            .collect();

        Self {
            framework: FrameworkOverview {
                name: framework.name.clone(),
                core_metaphor: framework.core_metaphor.clone(),
                elements: framework.elements.clone(),
                mappings: framework.mappings.clone(),
            },
            analysis: FrameworkStats {
                total_elements: framework.elements.len(),
                total_mappings: framework.mappings.len(),
                concepts_analyzed: concepts.len(),
            },
            concepts,
        }
    }
}

/// Writes `framework_report.json` into `output_dir`, creating the directory.
pub fn export_framework_report<S: AsRef<str>>(
    framework: &Framework,
    concepts: &[S],
    output_dir: &Path,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed creating report dir {}", output_dir.display()))?;
    let path = output_dir.join(FRAMEWORK_REPORT_FILE);
    let report = FrameworkReport::new(framework, concepts);
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("failed writing framework report {}", path.display()))?;
    Ok(path)
}
