// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::Instance;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one [`Instance`] per `[[instance]]` table
/// - Ctrl-C / SIGTERM handling, which drains every instance before returning
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config_path();
    let mut cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if let Some(kind) = args.watcher {
        cfg.override_watcher(kind);
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let instances = start_instances(&cfg).await?;
    info!(
        instances = instances.len(),
        root = %cfg.root().display(),
        "wado running; press Ctrl-C to stop"
    );

    wait_for_shutdown().await?;
    info!("shutdown requested; stopping all instances");
    kill_all(instances).await;
    Ok(())
}

/// Start every configured instance. If one fails, the ones already running
/// are stopped before the error is returned.
async fn start_instances(cfg: &ConfigFile) -> Result<Vec<Arc<Instance>>> {
    let mut started = Vec::with_capacity(cfg.instances().len());
    for instance_cfg in cfg.instances() {
        match Instance::start(instance_cfg, cfg.root()) {
            Ok(instance) => started.push(Arc::new(instance)),
            Err(err) => {
                kill_all(started).await;
                return Err(err)
                    .with_context(|| format!("starting instance '{}'", instance_cfg.name));
            }
        }
    }
    Ok(started)
}

/// Stop all instances concurrently and wait for every one of them.
async fn kill_all(instances: Vec<Arc<Instance>>) {
    let mut set = JoinSet::new();
    for instance in instances {
        set.spawn(async move {
            instance.kill().await;
        });
    }
    while let Some(res) = set.join_next().await {
        if let Err(err) = res {
            warn!(error = %err, "instance shutdown task failed");
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("listening for Ctrl-C")?,
        _ = term.recv() => debug!("received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")
}

/// Simple dry-run output: print instances, globs and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("wado dry-run");
    println!("  root = {}", cfg.root().display());
    println!();

    println!("instances ({}):", cfg.instances().len());
    for instance in cfg.instances() {
        println!("  - {}", instance.name);
        println!("      watcher: {:?}", instance.watcher);
        println!("      include: {:?}", instance.include);
        if !instance.exclude.is_empty() {
            println!("      exclude: {:?}", instance.exclude);
        }
        println!(
            "      min_delay: {}ms",
            instance.effective_min_delay().as_millis()
        );
        for cmd in &instance.cmds {
            println!("      cmd: {cmd}");
        }
    }

    debug!("dry-run complete (no execution)");
}
