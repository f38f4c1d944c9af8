use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;

use super::analysis::FusionAnalysis;

pub fn default_report_name() -> String {
    format!("fusion_analysis_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Writes `analysis` as pretty JSON. Without a destination the file is named after the
/// current local time inside `fallback_dir`.
pub fn export_analysis(
    analysis: &FusionAnalysis,
    destination: Option<&Path>,
    fallback_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let path = match destination {
        Some(path) => path.to_path_buf(),
        None => fallback_dir.join(default_report_name()),
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed creating report dir {}", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(analysis)?;
    std::fs::write(&path, payload)
        .with_context(|| format!("failed writing fusion report {}", path.display()))?;
    Ok(path)
}

pub fn read_analysis(path: &Path) -> anyhow::Result<FusionAnalysis> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading fusion report {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}
