//! clusteropts CLI - target machine detection and job script headers

use clap::Parser;
use clusteropts::config::{CliArgs, Commands, LauncherConfig, MachineArgs, ParallelArgs};
use clusteropts::error::{IoResultExt, Result};
use clusteropts::system::{
    ClusterOptions, HostEnvironment, JobBinding, LocalHost, StaticHost, Topology,
};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v
    let default_level = match (args.quiet, args.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    match &args.command {
        Commands::Detect { machine, json } => cmd_detect(machine, *json),
        Commands::Id { machine, parallel } => cmd_id(machine, parallel),
        Commands::Header {
            machine,
            parallel,
            job_id,
            output_dir,
            start_dir,
            output,
        } => cmd_header(
            machine,
            parallel,
            &JobBinding::new(job_id, output_dir),
            start_dir.as_deref(),
            output.as_deref(),
        ),
    }
}

fn resolve(machine: &MachineArgs, config: &LauncherConfig) -> Result<ClusterOptions> {
    let host: Box<dyn HostEnvironment> = match &machine.fqdn {
        Some(fqdn) => Box::new(StaticHost::local_with_fqdn(fqdn)),
        None => Box::new(LocalHost),
    };
    Ok(ClusterOptions::new(host.as_ref(), &machine.machine)?.with_config(config))
}

fn configured(machine: &MachineArgs, parallel: &ParallelArgs) -> Result<ClusterOptions> {
    let config = LauncherConfig::from_cli(machine, parallel.check_divisibility)?;
    let mut opts = resolve(machine, &config)?;
    opts.setup(parallel.space, parallel.time)?;
    Ok(opts)
}

#[derive(Serialize)]
struct DetectReport<'a> {
    machine: &'a str,
    #[serde(flatten)]
    topology: Topology,
}

fn cmd_detect(machine: &MachineArgs, json: bool) -> Result<()> {
    let config = LauncherConfig::from_cli(machine, false)?;
    let opts = resolve(machine, &config)?;

    let report = DetectReport {
        machine: opts.target_machine().name(),
        topology: opts.topology(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Target machine:  {}", report.machine);
        println!("Total cores:     {}", report.topology.total_max_cores);
        println!("Cores per node:  {}", report.topology.cores_per_node);
        println!("Nodes:           {}", report.topology.total_max_nodes);
    }

    Ok(())
}

fn cmd_id(machine: &MachineArgs, parallel: &ParallelArgs) -> Result<()> {
    let opts = configured(machine, parallel)?;
    println!("{}", opts.unique_id());
    Ok(())
}

fn cmd_header(
    machine: &MachineArgs,
    parallel: &ParallelArgs,
    job: &JobBinding,
    start_dir: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let opts = configured(machine, parallel)?;

    let header = match start_dir {
        Some(dir) => opts.script_header_from(dir, job)?,
        None => opts.script_header(job)?,
    };
    info!(
        root = %header.project_root.display(),
        id = %opts.unique_id(),
        "rendered script header"
    );

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", header)).with_path(path)?;
            info!(path = %path.display(), "wrote script header");
        }
        None => println!("{}", header),
    }

    Ok(())
}
