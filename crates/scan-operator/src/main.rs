//! scan-operator entry point.
//!
//! Thin: parses the CLI, loads config, sets up tracing, then either prints a
//! manifest or runs the controller next to the probe server.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scan_config::{load_layered_yaml, OperatorConfig};
use scan_operator::{controller, manifests, probes, state};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "scan-operator")]
#[command(about = "Keeps a CronJob or Job in place for every ClusterScan", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller and the /healthz + /readyz probe server
    Run {
        /// Layered config paths in merge order (base -> env -> cluster)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Watch only this namespace (overrides config and SCAN_WATCH_NAMESPACE)
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Print the ClusterScan CustomResourceDefinition as YAML
    Crdgen,

    /// Print the ClusterRole the operator needs as YAML
    Rbac,

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; in-cluster deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run {
            config_paths,
            namespace,
        } => run(&config_paths, namespace).await,
        Commands::Crdgen => {
            print!("{}", manifests::crd_yaml()?);
            Ok(())
        }
        Commands::Rbac => {
            print!("{}", manifests::rbac_yaml()?);
            Ok(())
        }
        Commands::ConfigHash { paths } => {
            let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = load_layered_yaml(&refs)?;
            // Type-check so a hash is never printed for a config the operator would refuse.
            loaded.operator_config()?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }
    }
}

async fn run(config_paths: &[String], namespace: Option<String>) -> Result<()> {
    let refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&refs)?;
    let mut cfg: OperatorConfig = loaded.operator_config()?.with_process_env()?;
    if let Some(ns) = namespace {
        cfg.watch_namespace = Some(ns);
    }

    init_tracing(&cfg.log_filter);
    info!(
        config_hash = %loaded.config_hash,
        probe_addr = %cfg.probe_addr,
        "scan-operator v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let client = kube::Client::try_default()
        .await
        .context("failed to build kubernetes client")?;

    let shared = Arc::new(state::OperatorState::new());

    let app = probes::build_router(Arc::clone(&shared)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
            .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
    );
    let listener = tokio::net::TcpListener::bind(cfg.probe_addr)
        .await
        .with_context(|| format!("failed to bind probe server on {}", cfg.probe_addr))?;
    info!("probe server listening on http://{}", cfg.probe_addr);

    // The controller owns shutdown (SIGINT/SIGTERM); the probe server goes
    // down with it.
    tokio::select! {
        () = controller::run(client, &cfg, Arc::clone(&shared)) => {}
        res = axum::serve(listener, app) => {
            res.context("probe server crashed")?;
            warn!("probe server exited; stopping");
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
