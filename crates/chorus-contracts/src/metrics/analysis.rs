use serde::{Deserialize, Serialize};

use super::terms::Vocabularies;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    #[serde(rename = "philosophical_terms")]
    pub philosophical_term_count: u64,
    #[serde(rename = "revolutionary_terms")]
    pub revolutionary_term_count: u64,
    #[serde(rename = "metaphorical_images")]
    pub metaphor_image_count: u64,
    pub character_count: u64,
    pub line_count: u64,
    #[serde(rename = "avg_line_length")]
    pub average_line_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreservationRatios {
    pub philosophical: f64,
    pub revolutionary: f64,
    pub metaphorical: f64,
}

impl PreservationRatios {
    /// Share of each category's combined source presence that survives into `fused`.
    pub fn compute(first: &TextMetrics, second: &TextMetrics, fused: &TextMetrics) -> Self {
        Self {
            philosophical: ratio(
                fused.philosophical_term_count,
                first.philosophical_term_count + second.philosophical_term_count,
            ),
            revolutionary: ratio(
                fused.revolutionary_term_count,
                first.revolutionary_term_count + second.revolutionary_term_count,
            ),
            metaphorical: ratio(
                fused.metaphor_image_count,
                first.metaphor_image_count + second.metaphor_image_count,
            ),
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Metrics for the two source voices and their fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionAnalysis {
    #[serde(rename = "basilisk_metrics")]
    pub first: TextMetrics,
    #[serde(rename = "pliny_metrics")]
    pub second: TextMetrics,
    #[serde(rename = "fusion_metrics")]
    pub fused: TextMetrics,
    #[serde(rename = "preservation_ratios")]
    pub ratios: PreservationRatios,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    vocabularies: Vocabularies,
}

impl MetricsCalculator {
    pub fn new(vocabularies: Vocabularies) -> Self {
        Self { vocabularies }
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }

    pub fn analyze(&self, text: &str) -> TextMetrics {
        // `split` always yields at least one segment, even for "".
        let line_lengths: Vec<u64> = text
            .split('\n')
            .map(|line| line.chars().count() as u64)
            .collect();
        let line_count = line_lengths.len() as u64;
        let total: u64 = line_lengths.iter().sum();

        TextMetrics {
            philosophical_term_count: self.vocabularies.philosophical.count_matches(text) as u64,
            revolutionary_term_count: self.vocabularies.revolutionary.count_matches(text) as u64,
            metaphor_image_count: self.vocabularies.metaphorical.count_matches(text) as u64,
            character_count: text.chars().count() as u64,
            line_count,
            average_line_length: if line_count == 0 {
                0.0
            } else {
                total as f64 / line_count as f64
            },
        }
    }

    pub fn analyze_fusion(&self, first: &str, second: &str, fused: &str) -> FusionAnalysis {
        let first = self.analyze(first);
        let second = self.analyze(second);
        let fused = self.analyze(fused);
        let ratios = PreservationRatios::compute(&first, &second, &fused);
        FusionAnalysis {
            first,
            second,
            fused,
            ratios,
        }
    }
}
