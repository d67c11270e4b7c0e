//! Configuration settings for clusteropts
//!
//! Defines the CLI arguments, the launcher configuration file and defaults
//! for script header rendering.

use crate::error::{IoResultExt, Result};
use crate::system::{DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// clusteropts - HPC machine detection and job script headers
#[derive(Parser, Debug, Clone)]
#[command(name = "clusteropts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect the target HPC machine and render batch-script headers")]
#[command(long_about = r#"
clusteropts resolves the HPC machine a job will run on, derives the MPI rank
layout for a space/time parallel run and renders the batch-scheduler header
for the job script.

Examples:
  clusteropts detect                                   # Autodetect from FQDN
  clusteropts id --space 4 --time 8                    # MPI_space4_time8
  clusteropts header --space 4 --time 8 \
      --job-id run_a --output-dir job_run_a            # Header to stdout
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Machine selection shared by all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct MachineArgs {
    /// Target machine name (empty = autodetect from FQDN)
    #[arg(short = 'm', long, default_value = "", env = "CLUSTEROPTS_MACHINE")]
    pub machine: String,

    /// Use this FQDN instead of resolving the local host
    #[arg(long, value_name = "FQDN")]
    pub fqdn: Option<String>,

    /// Launcher configuration file (JSON)
    #[arg(short = 'c', long, value_name = "PATH", env = "CLUSTEROPTS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Space/time parallelism arguments
#[derive(Args, Debug, Clone)]
pub struct ParallelArgs {
    /// Cores for spatial parallelism
    #[arg(short = 's', long, default_value = "1", value_name = "NUM")]
    pub space: u32,

    /// Cores for temporal parallelism
    #[arg(short = 't', long, default_value = "1", value_name = "NUM")]
    pub time: u32,

    /// Require space cores to divide the cores of a node
    #[arg(long)]
    pub check_divisibility: bool,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the resolved machine and core topology
    Detect {
        #[command(flatten)]
        machine: MachineArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the unique id for a parallelism configuration
    Id {
        #[command(flatten)]
        machine: MachineArgs,

        #[command(flatten)]
        parallel: ParallelArgs,
    },

    /// Render the batch-script header
    Header {
        #[command(flatten)]
        machine: MachineArgs,

        #[command(flatten)]
        parallel: ParallelArgs,

        /// Job identifier
        #[arg(long, value_name = "ID")]
        job_id: String,

        /// Output directory for scheduler logs
        #[arg(long, value_name = "DIR")]
        output_dir: String,

        /// Directory to start the project root search from (default: cwd)
        #[arg(long, value_name = "PATH")]
        start_dir: Option<PathBuf>,

        /// Write the header to a file instead of stdout
        #[arg(short = 'o', long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// LSF `#BSUB` directive values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LsfDirectives {
    /// Project code (`-P`)
    pub project: String,
    /// Wall-clock limit, hrs:mins (`-W`)
    pub wall_clock: String,
    /// MPI tasks per node (`span[ptile=N]`)
    pub tasks_per_node: u32,
    /// Queue (`-q`)
    pub queue: String,
}

impl Default for LsfDirectives {
    fn default() -> Self {
        Self {
            project: "NCIS0002".to_string(),
            wall_clock: "02:00".to_string(),
            tasks_per_node: 16,
            queue: "small".to_string(),
        }
    }
}

/// Launcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// LSF directive values
    pub lsf: LsfDirectives,
    /// Marker entry identifying the project root
    pub root_marker: String,
    /// Number of directories examined during the root search
    pub search_levels: usize,
    /// Enforce space-core divisibility in setup
    pub check_divisibility: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            lsf: LsfDirectives::default(),
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            search_levels: DEFAULT_SEARCH_LEVELS,
            check_divisibility: false,
        }
    }
}

impl LauncherConfig {
    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Resolve configuration for the CLI: file (if given) then flags
    pub fn from_cli(machine: &MachineArgs, check_divisibility: bool) -> Result<Self> {
        let mut config = match &machine.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.check_divisibility |= check_divisibility;
        Ok(config)
    }
}
