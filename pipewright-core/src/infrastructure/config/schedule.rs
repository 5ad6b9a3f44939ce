// pipewright-core/src/infrastructure/config/schedule.rs

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

use super::documents::load_documents;
use crate::domain::pipeline::ScheduleConfig;

/// Schedule documents keyed by their `name`, or by file stem when unnamed.
#[instrument]
pub fn load_schedules(dir: &Path) -> BTreeMap<String, ScheduleConfig> {
    let schedules: BTreeMap<String, ScheduleConfig> = load_documents::<ScheduleConfig>(dir)
        .into_iter()
        .filter_map(|(path, config)| {
            let name = config.name.clone().or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })?;
            Some((name, config))
        })
        .collect();
    info!("🗓️  Loaded {} schedule(s)", schedules.len());
    schedules
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_schedule_names() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("nightly.yaml"), "pipelines: [a, b]\n")?;
        fs::write(
            dir.path().join("x.yml"),
            "name: hourly\npipelines: [c]\n",
        )?;

        let schedules = load_schedules(dir.path());
        assert_eq!(schedules["nightly"].pipelines, vec!["a", "b"]);
        assert_eq!(schedules["hourly"].pipelines, vec!["c"]);
        Ok(())
    }
}
