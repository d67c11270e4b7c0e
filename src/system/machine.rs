//! Supported target machines
//!
//! Each [`Machine`] variant owns its FQDN detection rule, its known core
//! topology and the batch-script header it renders.

use crate::config::LsfDirectives;
use crate::error::{ClusterError, Result};
use serde::Serialize;
use std::fmt;

use super::cluster::{JobBinding, RankLayout};

/// Core count that has not been resolved for the machine
pub const UNRESOLVED: i64 = -1;

/// FQDN fragments identifying the known clusters, checked in order
const FQDN_PATTERNS: &[(&str, Machine)] = &[
    (".gw4.metoffice.gov.uk", Machine::Isambard),
    (".yellowstone", Machine::Yellowstone),
    (".cheyenne", Machine::Cheyenne),
];

/// Target HPC machine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Machine {
    /// GW4 Isambard (Met Office)
    Isambard,
    /// NCAR Yellowstone (LSF)
    Yellowstone,
    /// NCAR Cheyenne
    Cheyenne,
    /// Any other host, identified by its name
    Local(String),
}

impl Machine {
    /// Detect a known cluster from a fully-qualified domain name
    pub fn detect(fqdn: &str) -> Option<Machine> {
        FQDN_PATTERNS
            .iter()
            .find(|(pattern, _)| fqdn.contains(pattern))
            .map(|(_, machine)| machine.clone())
    }

    /// Parse an explicit machine name
    pub fn from_name(name: &str) -> Machine {
        match name {
            "isambard" => Machine::Isambard,
            "yellowstone" => Machine::Yellowstone,
            "cheyenne" => Machine::Cheyenne,
            other => Machine::Local(other.to_string()),
        }
    }

    /// Machine name as written into script headers
    pub fn name(&self) -> &str {
        match self {
            Machine::Isambard => "isambard",
            Machine::Yellowstone => "yellowstone",
            Machine::Cheyenne => "cheyenne",
            Machine::Local(name) => name,
        }
    }

    /// Total cores and cores per node known for this machine
    pub fn known_topology(&self) -> Option<(i64, i64)> {
        match self {
            Machine::Cheyenne => Some((4096, 123)),
            Machine::Isambard | Machine::Yellowstone | Machine::Local(_) => None,
        }
    }

    /// Render the batch-script header for this machine
    pub fn render_header(
        &self,
        layout: &RankLayout,
        job: &JobBinding,
        lsf: &LsfDirectives,
    ) -> Result<String> {
        let mut content = String::from("#!/bin/bash\n");
        content.push_str(&format!("# TARGET MACHINE: {}", self.name()));

        match self {
            Machine::Yellowstone => {
                content.push_str(&render_lsf(layout, job, lsf));
            }
            Machine::Cheyenne => {
                return Err(ClusterError::not_implemented(self.name(), "script header"));
            }
            Machine::Isambard | Machine::Local(_) => {}
        }

        Ok(content)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Core topology of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Topology {
    /// Total cores available, or [`UNRESOLVED`]
    pub total_max_cores: i64,
    /// Physical cores per node, or [`UNRESOLVED`]
    pub cores_per_node: i64,
    /// Derived node count
    pub total_max_nodes: i64,
}

impl Topology {
    /// Build a topology, rejecting core counts that do not split into whole nodes
    pub fn new(total_max_cores: i64, cores_per_node: i64) -> Result<Self> {
        let inconsistent = |total_max_nodes| ClusterError::InconsistentTopology {
            total_max_cores,
            cores_per_node,
            total_max_nodes,
        };

        let total_max_nodes = floor_div(total_max_cores, cores_per_node).ok_or(inconsistent(0))?;
        if total_max_nodes * cores_per_node != total_max_cores {
            return Err(inconsistent(total_max_nodes));
        }

        Ok(Self {
            total_max_cores,
            cores_per_node,
            total_max_nodes,
        })
    }

    /// Topology with both core counts unresolved
    pub fn unresolved() -> Self {
        Self {
            total_max_cores: UNRESOLVED,
            cores_per_node: UNRESOLVED,
            total_max_nodes: 1,
        }
    }

    /// Whether core counts were detected or configured
    pub fn is_resolved(&self) -> bool {
        self.total_max_cores > 0 && self.cores_per_node > 0
    }
}

/// Integer division rounding toward negative infinity
pub(crate) fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a.checked_rem(b)? != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn render_lsf(layout: &RankLayout, job: &JobBinding, lsf: &LsfDirectives) -> String {
    let mut script = String::from("\n#\n# LSF batch script to run an MPI application\n#\n");
    script.push_str("# YELLOW STONE SPECIFIC!!!\n");
    script.push_str("# https://www2.cisl.ucar.edu/resources/computational-systems/yellowstone/\n");
    script.push_str("#\n");
    script.push_str(&format!("#BSUB -P {}\t# project code\n", lsf.project));
    script.push_str(&format!("#BSUB -W {}\t\t# wall-clock time (hrs:mins)\n#\n", lsf.wall_clock));
    script.push_str(&format!("#BSUB -n {}\t# number of tasks in job\n", layout.mpi_ranks_total));
    script.push_str(&format!(
        "#BSUB -R \"span[ptile={0}]\"    # run {0} MPI tasks per node\n#\n",
        lsf.tasks_per_node
    ));
    script.push_str(&format!("#BSUB -outdir {}\n", job.output_dir));
    script.push_str(&format!("#BSUB -J {}\t# job name\n", job.job_id));
    script.push_str(&format!(
        "#BSUB -o {}.out  # output file name in which %J is replaced by the job ID\n",
        job.output_dir
    ));
    script.push_str(&format!(
        "#BSUB -e {}.out  # error file name in which %J is replaced by the job ID\n#\n",
        job.output_dir
    ));
    script.push_str(concat!(
        "## https://www2.cisl.ucar.edu/resources/computational-systems/yellowstone/",
        "using-computing-resources/queues-and-charges\n"
    ));
    script.push_str(&format!("#BSUB -q {}\n#\n\n", lsf.queue));
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(space: u32, time: u32) -> RankLayout {
        RankLayout::compute(space, time, 16)
    }

    fn job() -> JobBinding {
        JobBinding::new("run_tsm_l_erk", "job_bench_run_tsm_l_erk")
    }

    #[test]
    fn test_detect_from_fqdn() {
        assert_eq!(
            Machine::detect("login01.gw4.metoffice.gov.uk"),
            Some(Machine::Isambard)
        );
        assert_eq!(Machine::detect("yslogin1.yellowstone.ucar.edu"), Some(Machine::Yellowstone));
        assert_eq!(Machine::detect("r1i1n1.cheyenne.ucar.edu"), Some(Machine::Cheyenne));
        assert_eq!(Machine::detect("laptop.example.org"), None);
        assert_eq!(Machine::detect("yellowstone"), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Machine::from_name("cheyenne"), Machine::Cheyenne);
        assert_eq!(
            Machine::from_name("generic-host"),
            Machine::Local("generic-host".to_string())
        );
        assert_eq!(Machine::from_name("generic-host").name(), "generic-host");
    }

    #[test]
    fn test_generic_header_is_two_lines() {
        let header = Machine::from_name("generic-host")
            .render_header(&layout(1, 1), &job(), &LsfDirectives::default())
            .unwrap();
        assert_eq!(header, "#!/bin/bash\n# TARGET MACHINE: generic-host");
        assert_eq!(header.lines().count(), 2);
    }

    #[test]
    fn test_isambard_header_has_no_template() {
        let header = Machine::Isambard
            .render_header(&layout(4, 2), &job(), &LsfDirectives::default())
            .unwrap();
        assert_eq!(header.lines().count(), 2);
        assert!(header.ends_with("isambard"));
    }

    #[test]
    fn test_cheyenne_header_not_implemented() {
        let err = Machine::Cheyenne
            .render_header(&layout(1, 1), &job(), &LsfDirectives::default())
            .unwrap_err();
        assert!(matches!(err, ClusterError::NotImplemented { .. }));
    }

    #[test]
    fn test_yellowstone_lsf_template() {
        let header = Machine::Yellowstone
            .render_header(&layout(2, 8), &job(), &LsfDirectives::default())
            .unwrap();

        assert!(header.starts_with("#!/bin/bash\n# TARGET MACHINE: yellowstone\n#\n"));
        assert!(header.contains(
            "# LSF batch script to run an MPI application\n#\n# YELLOW STONE SPECIFIC!!!\n"
        ));
        assert!(header.contains("#BSUB -P NCIS0002\t# project code\n"));
        assert!(header.contains("#BSUB -W 02:00\t\t# wall-clock time (hrs:mins)\n"));
        assert!(header.contains("#BSUB -n 8\t# number of tasks in job\n"));
        assert!(header.contains("#BSUB -R \"span[ptile=16]\""));
        assert!(header.contains("#BSUB -outdir job_bench_run_tsm_l_erk\n"));
        assert!(header.contains("#BSUB -J run_tsm_l_erk\t# job name\n"));
        assert!(header.contains("#BSUB -o job_bench_run_tsm_l_erk.out "));
        assert!(header.contains("#BSUB -e job_bench_run_tsm_l_erk.out "));
        assert!(header.contains("#BSUB -q small\n"));
        assert!(header.ends_with("#\n\n"));
    }

    #[test]
    fn test_yellowstone_ptile_ignores_layout() {
        // 4 space cores on 16-core nodes gives 4 ranks per node, directive stays 16
        let header = Machine::Yellowstone
            .render_header(&layout(4, 3), &job(), &LsfDirectives::default())
            .unwrap();
        assert!(header.contains("span[ptile=16]"));
    }

    #[test]
    fn test_yellowstone_custom_directives() {
        let lsf = LsfDirectives {
            project: "P12345".to_string(),
            wall_clock: "00:30".to_string(),
            tasks_per_node: 32,
            queue: "regular".to_string(),
        };
        let header = Machine::Yellowstone
            .render_header(&layout(1, 4), &job(), &lsf)
            .unwrap();
        assert!(header.contains("#BSUB -P P12345"));
        assert!(header.contains("#BSUB -W 00:30"));
        assert!(header.contains("span[ptile=32]"));
        assert!(header.contains("#BSUB -q regular"));
    }

    #[test]
    fn test_topology_consistent() {
        let topo = Topology::new(64, 16).unwrap();
        assert_eq!(topo.total_max_nodes, 4);
        assert!(topo.is_resolved());
    }

    #[test]
    fn test_topology_unresolved_pair_is_consistent() {
        let topo = Topology::new(UNRESOLVED, UNRESOLVED).unwrap();
        assert_eq!(topo, Topology::unresolved());
        assert!(!topo.is_resolved());
    }

    #[test]
    fn test_topology_inconsistent() {
        let err = Topology::new(4096, 123).unwrap_err();
        match err {
            ClusterError::InconsistentTopology { total_max_nodes, .. } => {
                assert_eq!(total_max_nodes, 33)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(Topology::new(8, 0).is_err());
        assert!(matches!(
            Topology::new(i64::MIN, -1),
            Err(ClusterError::InconsistentTopology { .. })
        ));
    }

    #[test]
    fn test_topology_serializes_flat() {
        let value = serde_json::to_value(Topology::new(64, 16).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "total_max_cores": 64,
                "cores_per_node": 16,
                "total_max_nodes": 4
            })
        );
    }

    #[test]
    fn test_floor_div() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-1, -1), Some(1));
        assert_eq!(floor_div(-1, 2), Some(-1));
        assert_eq!(floor_div(16, -3), Some(-6));
        assert_eq!(floor_div(1, 0), None);
        assert_eq!(floor_div(i64::MIN, -1), None);
    }
}
