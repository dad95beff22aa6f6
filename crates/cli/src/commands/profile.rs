//! Connection profile commands
//!
//! Profiles are named admin endpoints with their token, stored in the
//! configuration file. Tokens are never printed.

use clap::Subcommand;
use comfy_table::{Table, presets};
use gp_core::config::{DEFAULT_TIMEOUT_SECS, sanitize_host};
use gp_core::{Profile, ProfileManager};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or replace a profile
    Set(SetArgs),

    /// List configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "local", "prod")
    pub name: String,

    /// Admin API host as host[:port], or http(s)://host[:port] to pick the scheme
    #[arg(value_name = "HOST")]
    pub address: String,

    /// Admin API bearer token
    #[arg(value_name = "TOKEN")]
    pub admin_token: String,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Use this profile when none is selected
    #[arg(long)]
    pub default: bool,

    /// Replace an existing profile with the same name
    #[arg(short, long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show scheme and timeout as a table
    #[arg(short, long)]
    pub long: bool,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for output, without the token
#[derive(Debug, Serialize)]
struct ProfileInfo {
    name: String,
    host: String,
    scheme: String,
    timeout_secs: u64,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            host: profile.host.clone(),
            scheme: profile.scheme.clone(),
            timeout_secs: profile.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

#[derive(Debug, Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub fn execute(cmd: ProfileCommands, formatter: &Formatter) -> ExitCode {
    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    let result = match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, formatter),
        ProfileCommands::List(args) => execute_list(&args, &manager, formatter),
        ProfileCommands::Remove(args) => execute_remove(&args, &manager, formatter),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn build_profile(args: &SetArgs) -> gp_core::Result<Profile> {
    if args.name.trim().is_empty() {
        return Err(gp_core::Error::Config("profile name cannot be empty".into()));
    }
    if args.admin_token.trim().is_empty() {
        return Err(gp_core::Error::Config("token cannot be empty".into()));
    }

    let (host, scheme) = sanitize_host(&args.address)?;
    let mut profile = Profile::new(&args.name, host, &args.admin_token);
    if let Some(scheme) = scheme {
        profile.scheme = scheme;
    }
    profile.timeout_secs = args.timeout;
    Ok(profile)
}

fn execute_set(
    args: SetArgs,
    manager: &ProfileManager,
    formatter: &Formatter,
) -> gp_core::Result<()> {
    let profile = build_profile(&args)?;
    manager.set(profile, args.force)?;
    if args.default {
        manager.set_default(&args.name)?;
    }

    report(
        formatter,
        &args.name,
        format!("Profile '{}' configured successfully", args.name),
    );
    Ok(())
}

fn execute_list(
    args: &ListArgs,
    manager: &ProfileManager,
    formatter: &Formatter,
) -> gp_core::Result<()> {
    let profiles = manager.list()?;
    let default = manager.default_profile()?.map(|p| p.name);

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: profiles.iter().map(ProfileInfo::from).collect(),
        });
        return Ok(());
    }

    if profiles.is_empty() {
        formatter.println("No profiles configured.");
        return Ok(());
    }

    let marker = |name: &str| if default.as_deref() == Some(name) { "*" } else { "" };
    if args.long {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_header(vec!["", "NAME", "HOST", "SCHEME", "TIMEOUT"]);
        for info in profiles.iter().map(ProfileInfo::from) {
            table.add_row(vec![
                marker(&info.name).to_string(),
                info.name,
                info.host,
                info.scheme,
                format!("{}s", info.timeout_secs),
            ]);
        }
        formatter.println(&table.to_string());
    } else {
        for profile in &profiles {
            formatter.println(&format!(
                "{:<1} {:<12} {}://{}",
                marker(&profile.name),
                profile.name,
                profile.scheme,
                profile.host
            ));
        }
    }
    Ok(())
}

fn execute_remove(
    args: &RemoveArgs,
    manager: &ProfileManager,
    formatter: &Formatter,
) -> gp_core::Result<()> {
    manager.remove(&args.name)?;
    report(
        formatter,
        &args.name,
        format!("Profile '{}' removed successfully", args.name),
    );
    Ok(())
}

fn report(formatter: &Formatter, name: &str, message: String) {
    if formatter.is_json() {
        formatter.json(&ProfileOperationOutput {
            success: true,
            profile: name.to_string(),
            message,
        });
    } else {
        formatter.success(&message);
    }
}
