//! Target machine detection and job script headers
//!
//! Resolves which HPC machine a run targets, validates its core topology and
//! renders the scheduler header for the job script.

pub mod cluster;
pub mod host;
pub mod machine;
mod root;

pub use cluster::{ClusterOptions, JobBinding, RankLayout, ScriptHeader};
pub use host::{HostEnvironment, LocalHost, StaticHost};
pub use machine::{Machine, Topology, UNRESOLVED};
pub use root::{find_project_root, DEFAULT_ROOT_MARKER, DEFAULT_SEARCH_LEVELS};
