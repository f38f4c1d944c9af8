use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::now_utc_iso;
use crate::metrics::PreservationRatios;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionRecord {
    pub prompt: String,
    pub fused_text: String,
    pub report_path: String,
    pub ratios: PreservationRatios,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_fusions: u64,
    pub fusions: Vec<FusionRecord>,
}

impl SessionSummary {
    /// Mean preservation ratios across the recorded fusions.
    pub fn mean_ratios(&self) -> PreservationRatios {
        if self.fusions.is_empty() {
            return PreservationRatios::default();
        }
        let count = self.fusions.len() as f64;
        let mut total = PreservationRatios::default();
        for record in &self.fusions {
            total.philosophical += record.ratios.philosophical;
            total.revolutionary += record.ratios.revolutionary;
            total.metaphorical += record.ratios.metaphorical;
        }
        PreservationRatios {
            philosophical: total.philosophical / count,
            revolutionary: total.revolutionary / count,
            metaphorical: total.metaphorical / count,
        }
    }
}

pub fn write_summary(
    path: &Path,
    summary: &SessionSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert(
        "mean_ratios".to_string(),
        serde_json::to_value(summary.mean_ratios())?,
    );
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}
