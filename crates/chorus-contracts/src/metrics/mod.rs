mod analysis;
mod report;
mod terms;

pub use analysis::{FusionAnalysis, MetricsCalculator, PreservationRatios, TextMetrics};
pub use report::{default_report_name, export_analysis, read_analysis};
pub use terms::{count_matches, Vocabularies, VocabulariesBuilder, Vocabulary};
