//! `fbxguard save`: snapshot the live configuration.

use tabled::Tabled;

use fbxguard_core::{Appliance, SavedDocument};

use crate::config::Context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SavedRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Document")]
    path: String,
}

impl From<&SavedDocument> for SavedRow {
    fn from(d: &SavedDocument) -> Self {
        Self {
            class: d.kind.to_string(),
            entries: d.entries,
            path: d.path.display().to_string(),
        }
    }
}

pub async fn handle(appliance: &Appliance, ctx: &Context) -> Result<(), CliError> {
    let saved = fbxguard_core::snapshot(appliance.client(), &ctx.plan).await?;
    let out = output::render_list(ctx.output, &saved, |d| SavedRow::from(d), |d| {
        d.path.display().to_string()
    });
    output::print_output(&out, ctx.quiet);
    Ok(())
}
