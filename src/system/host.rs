//! Host identity detection
//!
//! Machine autodetection reads the FQDN, hostname and CPU count through the
//! [`HostEnvironment`] trait so callers can substitute a fixed host.

use std::process::{Command, Output};
use tracing::{debug, warn};

/// Source of host identity used during machine detection
pub trait HostEnvironment {
    /// Fully-qualified domain name of the host
    fn fqdn(&self) -> String;

    /// Short hostname of the host
    fn hostname(&self) -> String;

    /// Number of logical CPUs
    fn logical_cpu_count(&self) -> usize;
}

/// The host this process is running on
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl HostEnvironment for LocalHost {
    fn fqdn(&self) -> String {
        // `hostname -f` resolves through the system resolver; fall back to
        // the plain name when it is unavailable.
        match run_command("hostname", &["-f"]) {
            Some(output) if output.status.success() => {
                let fqdn = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !fqdn.is_empty() {
                    debug!(fqdn = %fqdn, "resolved FQDN");
                    return fqdn;
                }
                self.hostname()
            }
            Some(output) => {
                warn!(
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "hostname -f failed, using plain hostname"
                );
                self.hostname()
            }
            None => self.hostname(),
        }
    }

    fn hostname(&self) -> String {
        hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn logical_cpu_count(&self) -> usize {
        num_cpus::get()
    }
}

/// A fixed host identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHost {
    /// Fully-qualified domain name
    pub fqdn: String,
    /// Short hostname
    pub hostname: String,
    /// Logical CPU count
    pub cpus: usize,
}

impl StaticHost {
    /// Create a host whose hostname is the first label of `fqdn`
    pub fn new(fqdn: impl Into<String>, cpus: usize) -> Self {
        let fqdn = fqdn.into();
        let hostname = fqdn.split('.').next().unwrap_or_default().to_string();
        Self {
            fqdn,
            hostname,
            cpus,
        }
    }

    /// Override only the FQDN of the local host
    pub fn local_with_fqdn(fqdn: impl Into<String>) -> Self {
        let local = LocalHost;
        Self {
            fqdn: fqdn.into(),
            hostname: local.hostname(),
            cpus: local.logical_cpu_count(),
        }
    }
}

impl HostEnvironment for StaticHost {
    fn fqdn(&self) -> String {
        self.fqdn.clone()
    }

    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn logical_cpu_count(&self) -> usize {
        self.cpus
    }
}

fn run_command(cmd: &str, args: &[&str]) -> Option<Output> {
    Command::new(cmd).args(args).output().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_host_splits_hostname() {
        let host = StaticHost::new("login01.gw4.metoffice.gov.uk", 64);
        assert_eq!(host.hostname(), "login01");
        assert_eq!(host.fqdn(), "login01.gw4.metoffice.gov.uk");
        assert_eq!(host.logical_cpu_count(), 64);
    }

    #[test]
    fn test_static_host_without_domain() {
        let host = StaticHost::new("laptop", 8);
        assert_eq!(host.hostname(), "laptop");
    }

    #[test]
    fn test_local_host_has_cpus() {
        assert!(LocalHost.logical_cpu_count() >= 1);
    }
}
