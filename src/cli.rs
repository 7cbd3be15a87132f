use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netfleet")]
#[command(version)]
#[command(about = "Configuration deployment and backup for network device fleets", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: <config dir>/netfleet.toml)
    #[arg(short, long, global = true, env = "NETFLEET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the hosts a run would target
    Inventory(InventoryArgs),

    /// Push a configuration template to devices of a tenant
    Deploy(DeployArgs),

    /// Retrieve running configurations and commit them to the tenant repository
    Backup(BackupArgs),

    /// Show configuration commits of a device
    History(HistoryArgs),

    /// Print a device configuration as of a commit
    Show(ShowArgs),

    /// Diff a device configuration between two commits
    Diff(DiffArgs),

    /// Run one command on a device
    Exec(ExecArgs),

    /// Show the interface summary of a device
    Interfaces(DeviceArgs),

    /// Apply a generated configuration snippet
    #[command(subcommand)]
    Configure(ConfigureCommand),

    /// Show the audit trail
    Audit(AuditArgs),

    /// Manage netfleet settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Fleet operations
// ============================================================================

#[derive(Args)]
pub struct InventoryArgs {
    /// Only devices of this tenant
    #[arg(short, long)]
    pub tenant: Option<i64>,

    /// Only these device ids (repeatable)
    #[arg(short, long = "device")]
    pub devices: Vec<i64>,

    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Tenant owning the devices
    #[arg(short, long)]
    pub tenant: i64,

    /// Device ids to deploy to (repeatable)
    #[arg(short, long = "device", required = true)]
    pub devices: Vec<i64>,

    /// File holding the configuration template
    #[arg(long)]
    pub template: PathBuf,

    /// Preview the change without committing (atomic platforms only)
    #[arg(long)]
    pub dry_run: bool,

    /// Hosts worked on at once (default from settings)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Print the job snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct BackupArgs {
    /// Only devices of this tenant
    #[arg(short, long)]
    pub tenant: Option<i64>,

    /// Only these device ids (repeatable)
    #[arg(short, long = "device")]
    pub devices: Vec<i64>,

    /// Hosts worked on at once (default from settings)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the job snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Device id
    #[arg(short, long)]
    pub device: i64,

    /// Maximum number of commits
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Device id
    #[arg(short, long)]
    pub device: i64,

    /// Commit hash (full or abbreviated)
    pub commit: String,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Device id
    #[arg(short, long)]
    pub device: i64,

    /// Older commit
    pub from: String,

    /// Newer commit
    pub to: String,
}

#[derive(Args)]
pub struct ExecArgs {
    /// Device id
    #[arg(short, long)]
    pub device: i64,

    /// Print the job snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Command to run, e.g. "show version"
    #[arg(required = true, trailing_var_arg = true)]
    pub command: Vec<String>,
}

#[derive(Args)]
pub struct DeviceArgs {
    /// Device id
    #[arg(short, long)]
    pub device: i64,

    /// Print the job snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Configure Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigureCommand {
    /// Assign an IPv4 address to an interface
    Ip {
        #[command(flatten)]
        target: DeviceArgs,

        /// Interface name, e.g. GigabitEthernet0/1
        #[arg(long)]
        interface: String,

        /// IPv4 address
        #[arg(long)]
        address: String,

        /// Dotted subnet mask
        #[arg(long)]
        mask: String,
    },

    /// Add a BGP neighbor
    Bgp {
        #[command(flatten)]
        target: DeviceArgs,

        /// Local AS number
        #[arg(long)]
        local_as: String,

        /// Neighbor IPv4 address
        #[arg(long)]
        neighbor: String,

        /// Neighbor AS number
        #[arg(long)]
        remote_as: String,
    },

    /// Add a route-map entry matching a prefix list
    Policy {
        #[command(flatten)]
        target: DeviceArgs,

        /// Route-map name
        #[arg(long)]
        name: String,

        /// permit or deny
        #[arg(long)]
        action: String,

        /// Sequence number
        #[arg(long)]
        sequence: String,

        /// Prefix list to match
        #[arg(long)]
        prefix_list: String,
    },
}

// ============================================================================
// Audit / Config
// ============================================================================

#[derive(Args)]
pub struct AuditArgs {
    /// Only entries of this tenant
    #[arg(short, long)]
    pub tenant: Option<i64>,

    /// Maximum number of entries
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: usize,

    /// Print JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show resolved paths and settings
    Show,

    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
