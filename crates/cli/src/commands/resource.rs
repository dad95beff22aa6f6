//! Resource lifecycle commands
//!
//! Declared configuration is read as JSON from a file or stdin (`-`), and the
//! resulting state is printed as a `{resource, state}` envelope.

use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};
use gp_core::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Lifecycle operations shared by every resource type
#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// Create the resource from a declared configuration
    Create(CreateArgs),

    /// Read the current state of an existing resource
    Read(ReadArgs),

    /// Converge an existing resource from its old to its new configuration
    Update(UpdateArgs),

    /// Delete an existing resource
    Delete(DeleteArgs),

    /// Check a declared configuration without contacting the server
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Configuration file, or `-` for stdin
    #[arg(short, long)]
    pub config: String,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Resource identifier
    #[arg(long)]
    pub id: String,

    /// Configuration file, or `-` for stdin
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Resource identifier
    #[arg(long)]
    pub id: String,

    /// Previously applied configuration
    #[arg(long)]
    pub old: String,

    /// Desired configuration
    #[arg(long)]
    pub new: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Resource identifier
    #[arg(long)]
    pub id: String,

    /// Configuration file, or `-` for stdin
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file, or `-` for stdin
    #[arg(short, long)]
    pub config: String,
}

#[derive(Debug, Serialize)]
struct StateOutput<'a, S: Serialize> {
    resource: &'static str,
    state: Option<&'a S>,
}

#[derive(Debug, Serialize)]
struct DeleteOutput<'a> {
    resource: &'static str,
    id: &'a str,
    deleted: bool,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    resource: &'static str,
    valid: bool,
}

/// Load a JSON configuration from a file, or from stdin when `source` is `-`
pub fn load_config<C: DeserializeOwned>(source: &str) -> anyhow::Result<C> {
    let content = if source == "-" {
        std::io::read_to_string(std::io::stdin())
            .context("failed to read configuration from stdin")?
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("failed to read configuration file '{source}'"))?
    };
    serde_json::from_str(&content).with_context(|| format!("invalid configuration in '{source}'"))
}

fn load_optional<C: DeserializeOwned + Default>(source: Option<&str>) -> anyhow::Result<C> {
    source.map_or_else(|| Ok(C::default()), load_config::<C>)
}

/// Validate a declared configuration locally
pub fn validate<R: Resource>(args: &ValidateArgs, formatter: &Formatter) -> ExitCode {
    let config: R::Config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::UsageError;
        }
    };

    if let Err(e) = R::validate(&config) {
        formatter.error(&e.to_string());
        return ExitCode::from(&e);
    }

    if formatter.is_json() {
        formatter.json(&ValidateOutput {
            resource: R::TYPE_NAME,
            valid: true,
        });
    } else {
        formatter.success(&format!("{} configuration is valid", R::TYPE_NAME));
    }
    ExitCode::Success
}

/// Run a lifecycle command against a connected resource
pub async fn execute<R: Resource>(
    resource: &R,
    cmd: ResourceCommands,
    formatter: &Formatter,
) -> ExitCode {
    let result = match cmd {
        ResourceCommands::Create(args) => create(resource, args, formatter).await,
        ResourceCommands::Read(args) => read(resource, args, formatter).await,
        ResourceCommands::Update(args) => update(resource, args, formatter).await,
        ResourceCommands::Delete(args) => delete(resource, args, formatter).await,
        ResourceCommands::Validate(args) => return validate::<R>(&args, formatter),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

/// Configuration loading failures are usage errors, carried as `Config`
fn usage(e: anyhow::Error) -> gp_core::Error {
    gp_core::Error::Config(format!("{e:#}"))
}

async fn create<R: Resource>(
    resource: &R,
    args: CreateArgs,
    formatter: &Formatter,
) -> gp_core::Result<ExitCode> {
    let config: R::Config = load_config(&args.config).map_err(usage)?;
    let state = resource.create(&config).await?;
    print_state::<R>(formatter, "Created", Some(&state))?;
    Ok(ExitCode::Success)
}

async fn read<R: Resource>(
    resource: &R,
    args: ReadArgs,
    formatter: &Formatter,
) -> gp_core::Result<ExitCode> {
    let config: R::Config = load_optional(args.config.as_deref()).map_err(usage)?;
    let state = resource.read(&args.id, &config).await?;
    if state.is_none() && !formatter.is_json() {
        formatter.warning(&format!("{} '{}' no longer exists", R::TYPE_NAME, args.id));
        return Ok(ExitCode::Success);
    }
    print_state::<R>(formatter, "Read", state.as_ref())?;
    Ok(ExitCode::Success)
}

async fn update<R: Resource>(
    resource: &R,
    args: UpdateArgs,
    formatter: &Formatter,
) -> gp_core::Result<ExitCode> {
    if args.old == "-" && args.new == "-" {
        return Err(gp_core::Error::Config(
            "only one of --old and --new can be read from stdin".into(),
        ));
    }
    let old: R::Config = load_config(&args.old).map_err(usage)?;
    let new: R::Config = load_config(&args.new).map_err(usage)?;
    let state = resource.update(&args.id, &old, &new).await?;
    print_state::<R>(formatter, "Updated", Some(&state))?;
    Ok(ExitCode::Success)
}

async fn delete<R: Resource>(
    resource: &R,
    args: DeleteArgs,
    formatter: &Formatter,
) -> gp_core::Result<ExitCode> {
    let config: R::Config = load_optional(args.config.as_deref()).map_err(usage)?;
    resource.delete(&args.id, &config).await?;

    if formatter.is_json() {
        formatter.json(&DeleteOutput {
            resource: R::TYPE_NAME,
            id: &args.id,
            deleted: true,
        });
    } else {
        formatter.success(&format!("Deleted {} '{}'", R::TYPE_NAME, args.id));
    }
    Ok(ExitCode::Success)
}

fn print_state<R: Resource>(
    formatter: &Formatter,
    verb: &str,
    state: Option<&R::State>,
) -> gp_core::Result<()> {
    if formatter.is_json() {
        formatter.json(&StateOutput {
            resource: R::TYPE_NAME,
            state,
        });
        return Ok(());
    }

    let value = serde_json::to_value(state)?;
    match value.get("id").and_then(|id| id.as_str()) {
        Some(id) => formatter.success(&format!("{verb} {} '{id}'", R::TYPE_NAME)),
        None => formatter.success(&format!("{verb} {}", R::TYPE_NAME)),
    }
    formatter.fields(&value);
    Ok(())
}
