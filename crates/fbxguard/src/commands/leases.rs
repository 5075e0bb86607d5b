//! `fbxguard leases`: static or dynamic DHCP leases.

use serde::Serialize;
use tabled::Tabled;

use fbxguard_core::{Appliance, CoreError};

use crate::cli::LeasesArgs;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

#[derive(Clone, Serialize, Tabled)]
struct LeaseRow {
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
}

pub async fn handle(appliance: &Appliance, args: &LeasesArgs, ctx: &Context) -> Result<(), CliError> {
    let client = appliance.client();
    let leases = if args.dynamic {
        client.list_dynamic_leases().await
    } else {
        client.list_static_leases().await
    }
    .map_err(CoreError::from)?;

    let rows: Vec<LeaseRow> = leases
        .into_iter()
        .map(|(hostname, lease)| LeaseRow {
            hostname,
            mac: lease.mac,
            ip: lease.ip,
        })
        .collect();
    let out = output::render_list(ctx.output, &rows, LeaseRow::clone, |r| {
        format!("{} {}", r.hostname, r.ip)
    });
    output::print_output(&out, ctx.quiet);
    Ok(())
}
