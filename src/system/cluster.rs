//! Cluster options for space/time parallel runs
//!
//! [`ClusterOptions`] resolves the target machine and its core topology once,
//! then carries the parallelism configuration used to name jobs and render
//! batch-script headers.

use crate::config::{LauncherConfig, LsfDirectives};
use crate::error::{ClusterError, IoResultExt, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::host::HostEnvironment;
use super::machine::{floor_div, Machine, Topology};
use super::root::{find_project_root, DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS};

/// Caller-owned names referenced by scheduler templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBinding {
    /// Job identifier (LSF `-J`)
    pub job_id: String,
    /// Output directory; also the stem of the `.out` files
    pub output_dir: String,
}

impl JobBinding {
    /// Create a binding from a job id and output directory
    pub fn new(job_id: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// MPI rank layout derived from the parallelism settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankLayout {
    /// Threads along the time dimension
    pub real_time_threads: u32,
    /// Space cores times time cores
    pub total_cores: u64,
    /// One MPI rank per time slice
    pub mpi_ranks_total: u32,
    /// Ranks fitting on one node, negative while the topology is unresolved
    pub mpi_ranks_per_node: i64,
}

impl RankLayout {
    /// Derive the layout for the given space/time cores on nodes of `cores_per_node`
    pub fn compute(par_space_cores: u32, par_time_cores: u32, cores_per_node: i64) -> Self {
        Self {
            real_time_threads: par_time_cores,
            total_cores: u64::from(par_space_cores) * u64::from(par_time_cores),
            mpi_ranks_total: par_time_cores,
            mpi_ranks_per_node: floor_div(cores_per_node, i64::from(par_space_cores)).unwrap_or(0),
        }
    }
}

/// A rendered batch-script header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHeader {
    /// Script text
    pub content: String,
    /// Directory containing the project root marker
    pub project_root: PathBuf,
    /// Layout the header was rendered for
    pub layout: RankLayout,
}

impl fmt::Display for ScriptHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Machine identity, topology and parallelism settings for one run
#[derive(Debug, Clone)]
pub struct ClusterOptions {
    target_machine: Machine,
    topology: Topology,
    par_space_cores: u32,
    par_time_cores: u32,
    check_divisibility: bool,
    lsf: LsfDirectives,
    root_marker: String,
    search_levels: usize,
}

impl ClusterOptions {
    /// Resolve cluster options for `target_machine`, autodetecting when it is empty.
    ///
    /// Autodetection matches the host FQDN against the known clusters and
    /// otherwise treats the host as a single node with all of its logical
    /// CPUs. An explicit name is taken as-is with unresolved core counts.
    ///
    /// # Errors
    ///
    /// `NotImplemented` for yellowstone (any path) and for an autodetected
    /// cheyenne; `InconsistentTopology` when cores do not split into nodes.
    pub fn new(host: &dyn HostEnvironment, target_machine: &str) -> Result<Self> {
        let (machine, topology) = if target_machine.is_empty() {
            Self::autodetect(host)?
        } else {
            let machine = Machine::from_name(target_machine);
            debug!(machine = %machine, "using explicit target machine");
            if machine == Machine::Yellowstone {
                return Err(ClusterError::not_implemented(machine.name(), "cluster setup"));
            }
            (machine, Topology::unresolved())
        };

        info!(
            machine = %machine,
            total_max_cores = topology.total_max_cores,
            cores_per_node = topology.cores_per_node,
            total_max_nodes = topology.total_max_nodes,
            "resolved target machine"
        );

        Ok(Self {
            target_machine: machine,
            topology,
            par_space_cores: 1,
            par_time_cores: 1,
            check_divisibility: false,
            lsf: LsfDirectives::default(),
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            search_levels: DEFAULT_SEARCH_LEVELS,
        })
    }

    /// Autodetect the target machine from the host
    pub fn detect(host: &dyn HostEnvironment) -> Result<Self> {
        Self::new(host, "")
    }

    fn autodetect(host: &dyn HostEnvironment) -> Result<(Machine, Topology)> {
        let fqdn = host.fqdn();
        debug!(fqdn = %fqdn, "autodetecting target machine");

        match Machine::detect(&fqdn) {
            Some(Machine::Isambard) => Ok((Machine::Isambard, Topology::unresolved())),
            Some(machine @ Machine::Cheyenne) => {
                if let Some((total, per_node)) = machine.known_topology() {
                    debug!(total, per_node, "cheyenne topology known but setup is stubbed");
                }
                Err(ClusterError::not_implemented(machine.name(), "cluster setup"))
            }
            Some(machine) => Err(ClusterError::not_implemented(machine.name(), "cluster setup")),
            None => {
                let cores = i64::try_from(host.logical_cpu_count())
                    .map_err(|_| ClusterError::config("logical CPU count out of range"))?;
                let topology = Topology::new(cores, cores)?;
                Ok((Machine::Local(host.hostname()), topology))
            }
        }
    }

    /// Apply launcher settings
    pub fn with_config(self, config: &LauncherConfig) -> Self {
        self.with_lsf_directives(config.lsf.clone())
            .with_divisibility_check(config.check_divisibility)
            .with_root_search(config.root_marker.clone(), config.search_levels)
    }

    /// Set the LSF directive values used by LSF templates
    pub fn with_lsf_directives(mut self, lsf: LsfDirectives) -> Self {
        self.lsf = lsf;
        self
    }

    /// Enable or disable the space-core divisibility check in [`setup`](Self::setup)
    pub fn with_divisibility_check(mut self, enabled: bool) -> Self {
        self.check_divisibility = enabled;
        self
    }

    /// Set the project root marker and the number of directories searched
    pub fn with_root_search(mut self, marker: impl Into<String>, levels: usize) -> Self {
        self.root_marker = marker.into();
        self.search_levels = levels;
        self
    }

    /// Set the space and time parallelism.
    ///
    /// With the divisibility check enabled, a run parallel in time must use
    /// a space core count that divides the node's cores.
    pub fn setup(&mut self, par_space_cores: u32, par_time_cores: u32) -> Result<()> {
        if self.check_divisibility && par_time_cores != 1 && self.topology.is_resolved() {
            let cores_per_node = self.topology.cores_per_node;
            if par_space_cores == 0 || cores_per_node % i64::from(par_space_cores) != 0 {
                return Err(ClusterError::InvalidDecomposition {
                    cores_per_node,
                    par_space_cores,
                });
            }
        }

        self.par_space_cores = par_space_cores;
        self.par_time_cores = par_time_cores;
        Ok(())
    }

    /// Identifier for the current parallelism configuration
    pub fn unique_id(&self) -> String {
        format!("MPI_space{}_time{}", self.par_space_cores, self.par_time_cores)
    }

    /// Rank layout for the current configuration
    pub fn rank_layout(&self) -> RankLayout {
        RankLayout::compute(
            self.par_space_cores,
            self.par_time_cores,
            self.topology.cores_per_node,
        )
    }

    /// Render the script header, searching for the project root from the current directory
    pub fn script_header(&self, job: &JobBinding) -> Result<ScriptHeader> {
        let cwd = std::env::current_dir().with_path(".")?;
        self.script_header_from(&cwd, job)
    }

    /// Render the script header, searching for the project root from `start`
    pub fn script_header_from(&self, start: &Path, job: &JobBinding) -> Result<ScriptHeader> {
        let layout = self.rank_layout();
        let project_root = find_project_root(start, &self.root_marker, self.search_levels)?;
        let content = self.target_machine.render_header(&layout, job, &self.lsf)?;

        Ok(ScriptHeader {
            content,
            project_root,
            layout,
        })
    }

    /// Resolved target machine
    pub fn target_machine(&self) -> &Machine {
        &self.target_machine
    }

    /// Core topology of the target machine
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Total cores, or -1 when unresolved
    pub fn total_max_cores(&self) -> i64 {
        self.topology.total_max_cores
    }

    /// Cores per node, or -1 when unresolved
    pub fn cores_per_node(&self) -> i64 {
        self.topology.cores_per_node
    }

    /// Number of nodes
    pub fn total_max_nodes(&self) -> i64 {
        self.topology.total_max_nodes
    }

    /// Cores for spatial parallelism
    pub fn par_space_cores(&self) -> u32 {
        self.par_space_cores
    }

    /// Cores for temporal parallelism
    pub fn par_time_cores(&self) -> u32 {
        self.par_time_cores
    }
}
