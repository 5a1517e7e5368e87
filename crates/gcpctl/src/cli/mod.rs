//! Command-line surface
//!
//! Resource commands (`instance`, `network`, `image`, `firewall`, `disk`)
//! submit a mutation and wait for its operation. `delete` tears down any
//! tracked resource by its logical name. `state` and `profile` manage the
//! local side.

use clap::{Parser, Subcommand};

pub mod resource;

pub use resource::*;

/// Compute Engine provisioning CLI
#[derive(Parser, Debug)]
#[command(name = "gcpctl")]
#[command(version, about = "Provision Compute Engine resources and wait for their operations")]
#[command(long_about = "
Provision Compute Engine resources and wait for their operations

Every create or delete is submitted, polled until the platform reports DONE,
and recorded in a local state file so resources can later be removed by name.

EXAMPLES:
    # Set up a profile
    gcpctl profile set dev --project my-project --zone us-central1-a --access-token ya29...

    # Create an instance and wait for it
    gcpctl instance create web-1 --image projects/debian-cloud/global/images/family/debian-12

    # Look up its internal IP
    gcpctl instance ip web-1

    # Tear it down again by logical name
    gcpctl delete web-1

    # JSON output for scripting
    gcpctl state list -o json

Run `gcpctl <command> --help` for per-command details.
")]
pub struct Cli {
    /// Named profile (falls back to the default profile)
    #[arg(long, short, global = true, env = "GCPCTL_PROFILE")]
    pub profile: Option<String>,

    /// Config file to use instead of the platform default
    #[arg(long, global = true, env = "GCPCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Path to the resource state file
    #[arg(long, global = true, env = "GCPCTL_STATE_FILE")]
    pub state_file: Option<String>,

    /// How results are rendered
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Maximum seconds to wait for an operation (overrides the profile)
    #[arg(long, global = true)]
    pub wait_timeout: Option<u64>,

    /// Seconds between operation polls (overrides the profile)
    #[arg(long, global = true)]
    pub wait_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table for listings, plain text otherwise
    Auto,
    Json,
    Yaml,
    Table,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// VM instance operations
    #[command(subcommand, visible_alias = "vm")]
    Instance(InstanceCommands),

    /// VPC network operations
    #[command(subcommand, visible_alias = "net")]
    Network(NetworkCommands),

    /// Disk image operations
    #[command(subcommand)]
    Image(ImageCommands),

    /// Firewall rule operations
    #[command(subcommand, visible_alias = "fw")]
    Firewall(FirewallCommands),

    /// Persistent disk operations
    #[command(subcommand)]
    Disk(DiskCommands),

    /// Delete a tracked resource by its logical name
    #[command(after_help = "EXAMPLES:
    # Delete whatever was created as 'web-1'
    gcpctl delete web-1

    # Succeed even if the resource is already gone
    gcpctl delete web-1 --tolerate-missing
")]
    Delete {
        /// Logical name the resource was created under
        name: String,

        /// Treat a resource that no longer exists as deleted
        #[arg(long)]
        tolerate_missing: bool,
    },

    /// Long-running operation utilities
    #[command(subcommand, visible_alias = "op")]
    Operation(OperationCommands),

    /// Inspect the local resource state file
    #[command(subcommand)]
    State(StateCommands),

    /// Manage connection profiles
    #[command(subcommand, visible_alias = "prof")]
    Profile(ProfileCommands),

    /// Print a completion script to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show version information
    #[command(visible_alias = "ver")]
    Version,
}

#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Wait for an operation to finish
    #[command(after_help = "EXAMPLES:
    # Zonal operation
    gcpctl operation wait operation-1712345678-abc --zone us-central1-a

    # Global operation (networks, images, firewall rules)
    gcpctl operation wait operation-1712345678-def --global
")]
    Wait {
        /// Operation name as returned by the API
        operation: String,

        /// Zone of a zonal operation (defaults to the profile zone)
        #[arg(long, conflicts_with = "global")]
        zone: Option<String>,

        /// The operation is global
        #[arg(long)]
        global: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// List tracked resources
    #[command(visible_alias = "ls")]
    List,

    /// Show one tracked resource
    Show {
        /// Logical name
        name: String,
    },

    /// Show the path to the state file
    Path,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List profiles
    #[command(visible_alias = "ls")]
    List,

    /// Print the config file location
    Path,

    /// Show one profile with its token masked
    #[command(visible_alias = "get")]
    Show {
        name: String,
    },

    /// Create or replace a profile
    #[command(visible_alias = "add")]
    #[command(after_help = "EXAMPLES:
    # Profile with an inline access token
    gcpctl profile set dev --project my-project --zone us-central1-a \\
        --access-token ya29.a0Af...

    # Profile reading an oauth2 token cache maintained elsewhere
    gcpctl profile set ci --project ci-project --zone europe-west1-b \\
        --token-file ~/.config/gcpctl/ci-token.json

    # Prompt for the token instead of passing it on the command line
    gcpctl profile set dev --project my-project --zone us-central1-a
")]
    Set {
        name: String,

        /// Project that owns the resources
        #[arg(long)]
        project: String,

        /// Default zone for instances and disks
        #[arg(long)]
        zone: String,

        /// Access token (prompted for if neither this nor --token-file is given)
        #[arg(long, conflicts_with = "token_file")]
        access_token: Option<String>,

        /// oauth2 token cache file to read the token from
        #[arg(long)]
        token_file: Option<String>,

        /// Compute API base URL
        #[arg(long, default_value = gcpctl_core::DEFAULT_API_URL)]
        api_url: String,

        /// Seconds to wait for an operation
        #[arg(long, default_value_t = 600)]
        poll_timeout: u64,

        /// Seconds between operation polls
        #[arg(long, default_value_t = 1)]
        poll_interval: u64,

        /// Store the access token in the OS keyring
        #[cfg(feature = "secure-storage")]
        #[arg(long)]
        use_keyring: bool,
    },

    /// Delete a profile and any keyring entry it references
    #[command(visible_alias = "rm")]
    Remove {
        name: String,
    },

    /// Set the default profile
    #[command(visible_alias = "def")]
    Default {
        /// Profile name to use by default
        name: String,
    },
}
