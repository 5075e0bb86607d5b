//! `fbxguard hosts`: LAN browser listing and single-host lookup.

use chrono::{DateTime, Local};
use tabled::Tabled;

use fbxguard_core::{Appliance, CoreError, LanZone, NetworkNode};

use crate::cli::HostsArgs;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

const NO_ADDRESS: &str = "<none>";

#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IPv4")]
    ip: String,
    #[tabled(rename = "Reachable")]
    reachable: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl From<&NetworkNode> for HostRow {
    fn from(n: &NetworkNode) -> Self {
        Self {
            name: n.name.clone(),
            ip: n.ip.clone().unwrap_or_else(|| NO_ADDRESS.into()),
            reachable: if n.reachable { "yes" } else { "no" }.into(),
            last_seen: n.last_time_reachable.map_or_else(String::new, format_timestamp),
        }
    }
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0).map_or_else(
        || secs.to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub async fn handle(appliance: &Appliance, args: &HostsArgs, ctx: &Context) -> Result<(), CliError> {
    let zone = if args.guest {
        LanZone::WifiGuest
    } else {
        LanZone::Public
    };
    let nodes = appliance
        .client()
        .list_network_nodes(zone)
        .await
        .map_err(CoreError::from)?;

    if let Some(ref name) = args.name {
        let node = nodes
            .get(name)
            .ok_or_else(|| CliError::HostNotFound { name: name.clone() })?;
        let ip = match node.ip.as_deref() {
            Some(ip) if node.reachable => ip,
            _ => return Err(CliError::HostUnreachable { name: name.clone() }),
        };
        let out = output::render_single(ctx.output, node, |_| ip.to_owned(), |_| ip.to_owned());
        output::print_output(&out, ctx.quiet);
        return Ok(());
    }

    let listed: Vec<NetworkNode> = nodes
        .into_values()
        .filter(|n| args.all || n.reachable)
        .collect();
    let out = output::render_list(ctx.output, &listed, |n| HostRow::from(n), |n| {
        format!("{} {}", n.name, n.ip.as_deref().unwrap_or(NO_ADDRESS))
    });
    output::print_output(&out, ctx.quiet);
    Ok(())
}
