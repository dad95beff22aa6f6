//! CLI command definitions and execution
//!
//! Every resource type shares the same create/read/update/delete/validate
//! surface; profiles and completions are local-only commands.

use clap::{Args, Parser, Subcommand};
use gp_admin::AdminClient;
use gp_core::config::Defaults;
use gp_core::resource::{BucketAliasResource, BucketKeyResource, BucketResource, KeyResource};
use gp_core::{ConfigManager, Endpoint, ProfileManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod profile;
mod resource;

pub use resource::ResourceCommands;

/// gp - Garage resource provider
///
/// Creates, reads, updates and deletes Garage buckets, bucket aliases,
/// bucket-key permissions and access keys through the admin API.
#[derive(Parser, Debug)]
#[command(name = "gp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Admin API connection overrides
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Connection profile to use instead of the default one
    #[arg(long, global = true, env = "GP_PROFILE")]
    pub profile: Option<String>,

    /// Admin API host, as host[:port] or http(s)://host[:port]
    #[arg(long, global = true, env = "GARAGE_HOST")]
    pub host: Option<String>,

    /// Admin API scheme: http or https
    #[arg(long, global = true, env = "GARAGE_SCHEME")]
    pub scheme: Option<String>,

    /// Admin API bearer token
    #[arg(long, global = true, env = "GARAGE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage buckets
    #[command(subcommand)]
    Bucket(ResourceCommands),

    /// Manage permissions of an access key on a bucket
    #[command(subcommand)]
    BucketKey(ResourceCommands),

    /// Manage global and local bucket aliases
    #[command(subcommand)]
    BucketAlias(ResourceCommands),

    /// Manage access keys
    #[command(subcommand)]
    Key(ResourceCommands),

    /// Manage admin API connection profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

#[derive(Debug, Clone, Copy)]
enum ResourceKind {
    Bucket,
    BucketKey,
    BucketAlias,
    Key,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let defaults = match ConfigManager::new().and_then(|manager| manager.load()) {
        Ok(config) => config.defaults,
        Err(e) => {
            tracing::debug!(error = %e, "using built-in output defaults");
            Defaults::default()
        }
    };
    let formatter = Formatter::new(OutputConfig::with_defaults(
        cli.json,
        cli.no_color,
        cli.quiet,
        &defaults,
    ));

    let (kind, cmd) = match cli.command {
        Commands::Bucket(cmd) => (ResourceKind::Bucket, cmd),
        Commands::BucketKey(cmd) => (ResourceKind::BucketKey, cmd),
        Commands::BucketAlias(cmd) => (ResourceKind::BucketAlias, cmd),
        Commands::Key(cmd) => (ResourceKind::Key, cmd),
        Commands::Profile(cmd) => return profile::execute(cmd, &formatter),
        Commands::Completions(args) => return completions::execute(args),
    };

    if let ResourceCommands::Validate(args) = &cmd {
        return match kind {
            ResourceKind::Bucket => resource::validate::<BucketResource>(args, &formatter),
            ResourceKind::BucketKey => resource::validate::<BucketKeyResource>(args, &formatter),
            ResourceKind::BucketAlias => {
                resource::validate::<BucketAliasResource>(args, &formatter)
            }
            ResourceKind::Key => resource::validate::<KeyResource>(args, &formatter),
        };
    }

    let client = match connect(&cli.connection) {
        Ok(client) => client,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    match kind {
        ResourceKind::Bucket => {
            resource::execute(&BucketResource::new(&client), cmd, &formatter).await
        }
        ResourceKind::BucketKey => {
            resource::execute(&BucketKeyResource::new(&client), cmd, &formatter).await
        }
        ResourceKind::BucketAlias => {
            resource::execute(&BucketAliasResource::new(&client), cmd, &formatter).await
        }
        ResourceKind::Key => resource::execute(&KeyResource::new(&client), cmd, &formatter).await,
    }
}

/// Build an admin client from the selected profile and explicit overrides
fn connect(args: &ConnectionArgs) -> gp_core::Result<AdminClient> {
    let manager = ProfileManager::new()?;
    let profile = match args.profile.as_deref() {
        Some(name) => Some(manager.get(name)?),
        None => manager.default_profile()?,
    };

    let endpoint = Endpoint::resolve(
        profile.as_ref(),
        args.host.as_deref(),
        args.scheme.as_deref(),
        args.token.as_deref(),
    )?;
    tracing::debug!(?endpoint, profile = ?profile.as_ref().map(|p| &p.name), "resolved endpoint");

    AdminClient::new(&endpoint)
}
