use std::path::PathBuf;

use panel_merge::KeyGap;
use panel_model::StageReport;
use serde::Serialize;

/// Everything one CLI invocation produced.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<StageReport>,
    pub gaps: Vec<KeyGap>,
    pub exported: Option<PathBuf>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(StageReport::has_failures)
    }
}
