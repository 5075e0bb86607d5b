//! Profile resolution for the CLI.
//!
//! Loads the TOML config, picks the active profile, and layers the global
//! flags on top before handing off to `fbxguard_config` for translation.

use std::path::PathBuf;

use clap::ValueEnum;

use fbxguard_config::{Config, Profile};
use fbxguard_core::{ApplianceConfig, RestorePlan};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Everything a connected command needs, resolved once.
#[derive(Debug)]
pub struct Context {
    pub profile_name: String,
    pub appliance: ApplianceConfig,
    pub plan: RestorePlan,
    pub change_log: Option<PathBuf>,
    pub output: OutputFormat,
    pub quiet: bool,
}

pub fn load() -> Result<Config, CliError> {
    Ok(fbxguard_config::load_config()?)
}

/// `--profile`, else the config's `default_profile`, else `"default"`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.profile_name(global.profile.as_deref()).to_owned()
}

/// `--output`, else `defaults.output` from the config file.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    <OutputFormat as ValueEnum>::from_str(&cfg.defaults.output, true).map_err(|_| {
        CliError::Validation {
            field: "defaults.output".into(),
            reason: format!("unknown output format '{}'", cfg.defaults.output),
        }
    })
}

/// Build the connection settings and restore plan for the active profile.
///
/// Without a matching profile, `--url` alone is enough; everything else
/// falls back to defaults.
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Context, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: fbxguard_config::config_path().display().to_string(),
            });
        }
    };
    apply_overrides(&mut profile, global);

    let appliance =
        fbxguard_config::profile_to_appliance_config(&profile, &profile_name, &cfg.defaults)?;
    let plan = fbxguard_config::profile_restore_plan(&profile, &profile_name);

    Ok(Context {
        appliance,
        plan,
        change_log: profile.change_log.clone(),
        output: output_format(global, cfg)?,
        quiet: global.quiet,
        profile_name,
    })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref ca) = global.ca_cert {
        profile.ca_cert = Some(ca.clone());
        profile.insecure = Some(false);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
