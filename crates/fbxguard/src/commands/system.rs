//! `fbxguard system`: appliance system information.

use std::fmt::Write as _;

use serde_json::Value;

use fbxguard_core::{Appliance, CoreError};

use crate::config::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(appliance: &Appliance, ctx: &Context) -> Result<(), CliError> {
    let info = appliance
        .client()
        .get_system_info()
        .await
        .map_err(CoreError::from)?;
    let out = output::render_single(ctx.output, &info, detail, |v| {
        scalar_fields(v)
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn detail(info: &Value) -> String {
    let fields: Vec<(&str, String)> = scalar_fields(info).collect();
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in fields {
        let _ = writeln!(out, "{key:<width$}  {value}");
    }
    out.trim_end().to_owned()
}

/// Top-level scalar fields; nested objects (sensors, fans) are only shown
/// in JSON/YAML output.
fn scalar_fields(info: &Value) -> impl Iterator<Item = (&str, String)> {
    info.as_object()
        .into_iter()
        .flatten()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k.as_str(), s.clone())),
            Value::Number(n) => Some((k.as_str(), n.to_string())),
            Value::Bool(b) => Some((k.as_str(), b.to_string())),
            _ => None,
        })
}
