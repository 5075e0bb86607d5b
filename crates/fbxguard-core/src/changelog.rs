// ── Change log ──
//
// Append-only, human-readable record of detected drift. One block per
// reconciliation run; never parsed back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, SecondsFormat};

use crate::error::CoreError;
use crate::reconcile::ChangeReport;

/// File sink for [`ChangeReport`]s.
///
/// Concurrent reconciliations share one sink; blocks never interleave.
#[derive(Debug)]
pub struct ChangeLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block describing `report`, stamped with the current time.
    pub fn append(&self, report: &ChangeReport) -> Result<(), CoreError> {
        self.append_at(report, Local::now())
    }

    pub(crate) fn append_at(
        &self,
        report: &ChangeReport,
        at: DateTime<Local>,
    ) -> Result<(), CoreError> {
        let block = format!(
            "=== {} {} ===\n{}\n",
            at.to_rfc3339_opts(SecondsFormat::Secs, false),
            report.kind,
            report.render()
        );

        let _guard = self.lock.lock().expect("change log lock poisoned");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.error(&e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(&e))?;
        file.write_all(block.as_bytes()).map_err(|e| self.error(&e))
    }

    fn error(&self, err: &std::io::Error) -> CoreError {
        CoreError::ChangeLog {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::reconcile::{ChangeReport, Discrepancy};
    use crate::resource::ResourceKind;

    fn report() -> ChangeReport {
        ChangeReport {
            kind: ResourceKind::Redirections,
            missing: vec!["22/tcp".into()],
            discrepant: BTreeMap::from([(
                "80/tcp".to_string(),
                Discrepancy {
                    expected: json!({ "lan_port": 80 }),
                    found: json!({ "lan_port": 8080 }),
                },
            )]),
            exceeding: vec!["8443/tcp".into()],
        }
    }

    #[test]
    fn appends_one_block_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = ChangeLog::new(dir.path().join("logs").join("changes.log"));
        let at = Local.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();

        log.append_at(&report(), at).unwrap();
        log.append_at(&report(), at).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.matches("=== 2024-05-01T03:00:00").count(), 2);
        assert!(text.contains("port redirections ==="));
        assert!(text.contains("missing: 22/tcp"));
        assert!(text.contains("exceeding: 8443/tcp"));
        assert!(text.contains("mismatch: 80/tcp"));
    }
}
