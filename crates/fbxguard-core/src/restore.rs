// ── Restore & snapshot ──
//
// Restore reconciles every class against its saved document. Port
// redirections and static leases are independent and run together;
// incoming port policies run afterwards, on every run, whatever happened
// to the other two. A failure in one class never stops the others.

use std::path::PathBuf;

use fbxguard_api::ApiClient;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::changelog::ChangeLog;
use crate::documents::{check_keys, load_document, save_document};
use crate::error::CoreError;
use crate::reconcile::{ReconcileFailure, ReconcileOutcome, Reconciler};
use crate::resource::{IncomingPorts, Redirections, ResourceAccessor, ResourceKind, StaticLeases};

/// Where one class's desired document lives and how to tell the class
/// is still intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPlan {
    pub document: PathBuf,
    /// Key whose live presence means the class survived (e.g. `22/tcp`).
    /// When present, the class is skipped.
    pub sentinel: Option<String>,
}

impl ClassPlan {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
            sentinel: None,
        }
    }

    pub fn with_sentinel(mut self, key: impl Into<String>) -> Self {
        self.sentinel = Some(key.into());
        self
    }
}

/// Documents and sentinels for the three classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    pub redirections: ClassPlan,
    pub leases: ClassPlan,
    /// Its sentinel is ignored: incoming policies are always reconciled.
    pub incoming: ClassPlan,
}

/// What happened to one class during a restore.
#[derive(Debug)]
pub enum ClassResult {
    /// The sentinel key was live, the class was left alone.
    Skipped { sentinel: String },
    Reconciled(ReconcileOutcome),
    /// `outcome` is set when the failure came after the diff, e.g. a
    /// refused write; it carries the drift and the keys already restored.
    Failed {
        outcome: Option<ReconcileOutcome>,
        error: CoreError,
    },
}

impl ClassResult {
    /// The reconciliation outcome, complete or partial.
    pub fn outcome(&self) -> Option<&ReconcileOutcome> {
        match self {
            Self::Reconciled(outcome) => Some(outcome),
            Self::Failed { outcome, .. } => outcome.as_ref(),
            Self::Skipped { .. } => None,
        }
    }
}

/// Per-class results of one restore run, in execution order.
#[derive(Debug)]
pub struct RestoreSummary {
    pub results: Vec<(ResourceKind, ClassResult)>,
}

impl RestoreSummary {
    pub fn get(&self, kind: ResourceKind) -> Option<&ClassResult> {
        self.results.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }

    /// Classes where at least one desired entry was missing, including
    /// classes that failed part way through restoring them.
    pub fn changed_classes(&self) -> Vec<ResourceKind> {
        self.results
            .iter()
            .filter(|(_, r)| r.outcome().is_some_and(|o| o.changed))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (ResourceKind, &CoreError)> {
        self.results.iter().filter_map(|(k, r)| match r {
            ClassResult::Failed { error, .. } => Some((*k, error)),
            _ => None,
        })
    }

    /// No class changed and none failed.
    pub fn is_clean(&self) -> bool {
        self.changed_classes().is_empty() && self.failures().next().is_none()
    }
}

/// Reconcile all three classes against their saved documents.
pub async fn restore(
    client: &ApiClient,
    plan: &RestorePlan,
    change_log: Option<&ChangeLog>,
) -> RestoreSummary {
    let reconciler = Reconciler::new(change_log);
    let (redir_accessor, lease_accessor) = (Redirections(client), StaticLeases(client));

    let (redirections, leases) = tokio::join!(
        restore_class(&reconciler, &redir_accessor, &plan.redirections),
        restore_class(&reconciler, &lease_accessor, &plan.leases),
    );

    let incoming_plan = ClassPlan {
        sentinel: None,
        ..plan.incoming.clone()
    };
    let incoming = restore_class(&reconciler, &IncomingPorts(client), &incoming_plan).await;

    let summary = RestoreSummary {
        results: vec![
            (ResourceKind::Redirections, redirections),
            (ResourceKind::StaticLeases, leases),
            (ResourceKind::IncomingPorts, incoming),
        ],
    };
    info!(
        changed = summary.changed_classes().len(),
        failed = summary.failures().count(),
        "restore finished"
    );
    summary
}

async fn restore_class<A: ResourceAccessor>(
    reconciler: &Reconciler<'_>,
    accessor: &A,
    plan: &ClassPlan,
) -> ClassResult {
    let kind = accessor.kind();
    match try_restore_class(reconciler, accessor, plan).await {
        Ok(result) => result,
        Err(failure) => {
            warn!(%kind, error = %failure.error, "restore failed");
            ClassResult::Failed {
                outcome: failure.outcome.map(|o| *o),
                error: failure.error,
            }
        }
    }
}

async fn try_restore_class<A: ResourceAccessor>(
    reconciler: &Reconciler<'_>,
    accessor: &A,
    plan: &ClassPlan,
) -> Result<ClassResult, ReconcileFailure> {
    let kind = accessor.kind();
    let curr = accessor.fetch().await?;

    if let Some(sentinel) = plan.sentinel.as_deref() {
        if curr.contains_key(sentinel) {
            debug!(%kind, sentinel, "sentinel present, skipping");
            return Ok(ClassResult::Skipped {
                sentinel: sentinel.to_owned(),
            });
        }
        info!(%kind, sentinel, "sentinel missing, reloading saved configuration");
    }

    let want = load_document(kind, &plan.document)?;
    check_keys(&plan.document, &want, |entry| accessor.derived_key(entry))?;
    let outcome = reconciler.reconcile_against(accessor, &curr, &want).await?;
    Ok(ClassResult::Reconciled(outcome))
}

/// One document written by [`snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedDocument {
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub entries: usize,
}

/// Dump the live configuration of all three classes into the documents
/// named by `plan`, ready for a later [`restore`].
pub async fn snapshot(
    client: &ApiClient,
    plan: &RestorePlan,
) -> Result<Vec<SavedDocument>, CoreError> {
    let (redir_accessor, lease_accessor, incoming_accessor) =
        (Redirections(client), StaticLeases(client), IncomingPorts(client));
    let (redirections, leases, incoming) = tokio::try_join!(
        redir_accessor.fetch(),
        lease_accessor.fetch(),
        incoming_accessor.fetch(),
    )?;

    save_document(&plan.redirections.document, &redirections)?;
    save_document(&plan.leases.document, &leases)?;
    save_document(&plan.incoming.document, &incoming)?;

    let saved = vec![
        SavedDocument {
            kind: ResourceKind::Redirections,
            path: plan.redirections.document.clone(),
            entries: redirections.len(),
        },
        SavedDocument {
            kind: ResourceKind::StaticLeases,
            path: plan.leases.document.clone(),
            entries: leases.len(),
        },
        SavedDocument {
            kind: ResourceKind::IncomingPorts,
            path: plan.incoming.document.clone(),
            entries: incoming.len(),
        },
    ];
    for doc in &saved {
        info!(kind = %doc.kind, path = %doc.path.display(), entries = doc.entries, "saved");
    }
    Ok(saved)
}
