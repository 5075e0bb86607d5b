//! `fbxguard restore`: put lost entries back and report what changed.

use serde::Serialize;
use tabled::Tabled;

use fbxguard_core::{Appliance, ChangeLog, ClassResult, ResourceKind};

use crate::config::Context;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ClassView {
    kind: ResourceKind,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sentinel: Option<String>,
    restored: Vec<String>,
    mismatched: Vec<String>,
    exceeding: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    change_log_error: Option<String>,
}

impl ClassView {
    fn new(kind: ResourceKind, result: &ClassResult) -> Self {
        let mut view = Self {
            kind,
            status: "",
            sentinel: None,
            restored: Vec::new(),
            mismatched: Vec::new(),
            exceeding: Vec::new(),
            error: None,
            change_log_error: None,
        };
        match result {
            ClassResult::Skipped { sentinel } => {
                view.status = "intact";
                view.sentinel = Some(sentinel.clone());
            }
            ClassResult::Reconciled(outcome) => {
                view.status = if outcome.changed { "restored" } else { "in sync" };
            }
            ClassResult::Failed { error, .. } => {
                view.status = "failed";
                view.error = Some(error.to_string());
            }
        }
        // A failed class may still have restored some keys before stopping.
        if let Some(outcome) = result.outcome() {
            view.restored.clone_from(&outcome.applied);
            view.mismatched = outcome.report.discrepant.keys().cloned().collect();
            view.exceeding.clone_from(&outcome.report.exceeding);
            view.change_log_error.clone_from(&outcome.change_log_error);
        }
        view
    }
}

#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Restored")]
    restored: String,
    #[tabled(rename = "Mismatched")]
    mismatched: String,
    #[tabled(rename = "Exceeding")]
    exceeding: String,
}

impl From<&ClassView> for ClassRow {
    fn from(v: &ClassView) -> Self {
        let status = match (&v.sentinel, &v.error) {
            (Some(sentinel), _) => format!("{} ({sentinel} present)", v.status),
            (_, Some(error)) => format!("{}: {error}", v.status),
            _ => v.status.to_owned(),
        };
        let status = match &v.change_log_error {
            Some(reason) => format!("{status} (not logged: {reason})"),
            None => status,
        };
        Self {
            class: v.kind.to_string(),
            status,
            restored: v.restored.join(", "),
            mismatched: v.mismatched.join(", "),
            exceeding: v.exceeding.len().to_string(),
        }
    }
}

pub async fn handle(appliance: &Appliance, ctx: &Context) -> Result<(), CliError> {
    let change_log = ctx.change_log.as_ref().map(ChangeLog::new);
    let summary = fbxguard_core::restore(appliance.client(), &ctx.plan, change_log.as_ref()).await;

    let views: Vec<ClassView> = summary
        .results
        .iter()
        .map(|(kind, result)| ClassView::new(*kind, result))
        .collect();
    let out = output::render_list(ctx.output, &views, |v| ClassRow::from(v), |v| {
        format!("{} {}", v.kind.slug(), v.status.replace(' ', "-"))
    });
    output::print_output(&out, ctx.quiet);

    let failed: Vec<String> = summary.failures().map(|(kind, _)| kind.to_string()).collect();
    if !failed.is_empty() {
        return Err(CliError::RestoreIncomplete {
            classes: failed.join(", "),
        });
    }

    let changed = summary.changed_classes();
    if !changed.is_empty() {
        return Err(CliError::Drift {
            classes: changed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    Ok(())
}
