// ── Reconciler ──
//
// Compares desired entries against live ones for a single resource class,
// reports every difference, and restores only the keys that are missing.
// Entries that exist with different content are reported, never
// overwritten. Entries absent from the desired set are never removed.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use fbxguard_api::Entries;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::changelog::ChangeLog;
use crate::error::CoreError;
use crate::resource::{ResourceAccessor, ResourceKind};

/// Expected and found values of a key present on both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub expected: serde_json::Value,
    pub found: serde_json::Value,
}

/// Differences between desired and live entries of one resource class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    pub kind: ResourceKind,
    /// Desired keys absent from the appliance.
    pub missing: Vec<String>,
    /// Keys on both sides with differing content.
    pub discrepant: BTreeMap<String, Discrepancy>,
    /// Live keys not in the desired set. Informational only.
    pub exceeding: Vec<String>,
}

impl ChangeReport {
    /// Diff `want` against `curr`.
    pub fn compute<T: PartialEq + Serialize>(
        kind: ResourceKind,
        curr: &Entries<T>,
        want: &Entries<T>,
    ) -> Result<Self, CoreError> {
        let mut report = Self {
            kind,
            missing: Vec::new(),
            discrepant: BTreeMap::new(),
            exceeding: Vec::new(),
        };

        for (key, expected) in want {
            match curr.get(key) {
                None => report.missing.push(key.clone()),
                Some(found) if found != expected => {
                    report.discrepant.insert(
                        key.clone(),
                        Discrepancy {
                            expected: to_value(expected)?,
                            found: to_value(found)?,
                        },
                    );
                }
                Some(_) => {}
            }
        }
        report.exceeding = curr
            .keys()
            .filter(|k| !want.contains_key(*k))
            .cloned()
            .collect();

        Ok(report)
    }

    /// `true` when desired and live entries are identical.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.discrepant.is_empty() && self.exceeding.is_empty()
    }

    /// Human-readable rendering, one line per key.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for key in &self.missing {
            let _ = writeln!(out, "missing: {key}");
        }
        for (key, d) in &self.discrepant {
            let _ = writeln!(out, "mismatch: {key}");
            let _ = writeln!(out, "  expected: {}", d.expected);
            let _ = writeln!(out, "  found:    {}", d.found);
        }
        for key in &self.exceeding {
            let _ = writeln!(out, "exceeding: {key}");
        }
        out
    }
}

fn to_value<T: Serialize>(entry: &T) -> Result<serde_json::Value, CoreError> {
    serde_json::to_value(entry).map_err(|e| CoreError::Internal(format!("cannot render entry: {e}")))
}

/// Result of reconciling one resource class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub report: ChangeReport,
    /// At least one desired key was missing when the run started.
    pub changed: bool,
    /// Keys restored during this run, in order.
    pub applied: Vec<String>,
    /// The drift could not be recorded to the change log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_log_error: Option<String>,
}

/// A reconciliation that stopped early. `outcome` holds whatever was
/// reported and restored before `error`, if the diff got that far.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ReconcileFailure {
    pub outcome: Option<Box<ReconcileOutcome>>,
    pub error: CoreError,
}

impl From<CoreError> for ReconcileFailure {
    fn from(error: CoreError) -> Self {
        Self {
            outcome: None,
            error,
        }
    }
}

impl From<ReconcileFailure> for CoreError {
    fn from(failure: ReconcileFailure) -> Self {
        failure.error
    }
}

/// Drives [`ResourceAccessor`]s, optionally recording drift to a
/// [`ChangeLog`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler<'a> {
    change_log: Option<&'a ChangeLog>,
}

impl<'a> Reconciler<'a> {
    pub fn new(change_log: Option<&'a ChangeLog>) -> Self {
        Self { change_log }
    }

    /// Fetch the live entries and reconcile `want` against them.
    pub async fn reconcile<A: ResourceAccessor>(
        &self,
        accessor: &A,
        want: &Entries<A::Entry>,
    ) -> Result<ReconcileOutcome, ReconcileFailure> {
        let curr = accessor.fetch().await?;
        self.reconcile_against(accessor, &curr, want).await
    }

    /// Reconcile `want` against already fetched live entries.
    ///
    /// The report is logged before any write, so a failed write never
    /// hides the drift. A change log that cannot be written is only
    /// warned about. The first failed write aborts the class.
    pub async fn reconcile_against<A: ResourceAccessor>(
        &self,
        accessor: &A,
        curr: &Entries<A::Entry>,
        want: &Entries<A::Entry>,
    ) -> Result<ReconcileOutcome, ReconcileFailure> {
        let kind = accessor.kind();
        let report = ChangeReport::compute(kind, curr, want)?;
        let mut change_log_error = None;

        if report.is_empty() {
            debug!(%kind, entries = want.len(), "in sync");
        } else {
            info!(
                %kind,
                missing = report.missing.len(),
                discrepant = report.discrepant.len(),
                exceeding = report.exceeding.len(),
                "drift detected"
            );
            for key in report.discrepant.keys() {
                warn!(%kind, key, "entry differs from saved configuration, leaving it untouched");
            }
            if let Some(log) = self.change_log {
                if let Err(e) = log.append(&report) {
                    warn!(%kind, error = %e, "drift not recorded");
                    change_log_error = Some(e.to_string());
                }
            }
        }

        let mut outcome = ReconcileOutcome {
            changed: !report.missing.is_empty(),
            applied: Vec::with_capacity(report.missing.len()),
            change_log_error,
            report,
        };
        for key in &outcome.report.missing {
            let Some(entry) = want.get(key) else { continue };
            if let Err(e) = accessor.apply(key, entry).await {
                let error = CoreError::Apply {
                    kind,
                    key: key.clone(),
                    message: e.to_string(),
                };
                return Err(ReconcileFailure {
                    outcome: Some(Box::new(outcome)),
                    error,
                });
            }
            info!(%kind, key, "restored");
            outcome.applied.push(key.clone());
        }

        Ok(outcome)
    }
}
