//! # clusteropts - Cluster options for space/time parallel jobs
//!
//! clusteropts is the job-configuration glue between a simulation launcher
//! and the HPC machine it submits to. It detects the target machine from the
//! host FQDN, keeps the space/time parallelism of a run and renders the
//! batch-scheduler header for the job script.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clusteropts::system::{ClusterOptions, JobBinding, LocalHost};
//!
//! let mut opts = ClusterOptions::detect(&LocalHost).unwrap();
//! opts.setup(4, 8).unwrap();
//!
//! assert_eq!(opts.unique_id(), "MPI_space4_time8");
//!
//! let job = JobBinding::new("run_a", "job_run_a");
//! let header = opts.script_header(&job).unwrap();
//! println!("{}", header);
//! ```
//!
//! ## Fixed Hosts
//!
//! ```
//! use clusteropts::system::{ClusterOptions, Machine, StaticHost};
//!
//! let host = StaticHost::new("login01.gw4.metoffice.gov.uk", 64);
//! let opts = ClusterOptions::detect(&host).unwrap();
//! assert_eq!(opts.target_machine(), &Machine::Isambard);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod system;

// Re-export commonly used types
pub use config::{LauncherConfig, LsfDirectives};
pub use error::{ClusterError, Result};
pub use system::{ClusterOptions, JobBinding, Machine, ScriptHeader};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use clusteropts::prelude::*;
    //! ```

    pub use crate::config::{LauncherConfig, LsfDirectives};
    pub use crate::error::{ClusterError, Result};
    pub use crate::system::{
        find_project_root, ClusterOptions, HostEnvironment, JobBinding, LocalHost, Machine,
        RankLayout, ScriptHeader, StaticHost, Topology,
    };
}
