use berth_client::{ApiClient, ClientConfig, DEFAULT_API_URL};
use berth_core::{Pod, PodInfo};
use berth_scheduler::{Scheduler, SchedulerConfig, WatchController};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "berth", about = "Berth pod scheduler")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for unscheduled pods and bind them to nodes
    Run,
    /// Show how a pod would be placed on the current nodes, without binding
    Explain {
        /// Pod manifest (YAML or JSON)
        #[arg(long)]
        pod: PathBuf,
    },
}

/// Settings shared by every subcommand. Flags override environment
/// variables, which override the config file.
#[derive(Args)]
struct Settings {
    /// YAML scheduler configuration file
    #[arg(long, global = true, env = "BERTH_CONFIG")]
    config: Option<PathBuf>,

    /// Pods whose spec.schedulerName equals this are claimed
    #[arg(long, global = true, env = "BERTH_SCHEDULER_NAME")]
    scheduler_name: Option<String>,

    /// Server-side timeout of one watch connection
    #[arg(long, global = true, env = "BERTH_WATCH_TIMEOUT_SECS")]
    watch_timeout_secs: Option<u64>,

    /// Delay before reconnecting a closed watch
    #[arg(long, global = true, env = "BERTH_RETRY_DELAY_MS")]
    retry_delay_ms: Option<u64>,

    /// Weight of spare resources in the node score
    #[arg(long, global = true, env = "BERTH_ALPHA")]
    alpha: Option<f64>,

    /// Weight of traffic cost in the node score
    #[arg(long, global = true, env = "BERTH_BETA")]
    beta: Option<f64>,

    /// Weight of node saturation in the node score
    #[arg(long, global = true, env = "BERTH_GAMMA")]
    gamma: Option<f64>,

    /// Multiplier for CPU millicores
    #[arg(long, global = true, env = "BERTH_CPU_FACTOR")]
    cpu_factor: Option<f64>,

    /// Multiplier for memory MiB
    #[arg(long, global = true, env = "BERTH_MEMORY_FACTOR")]
    memory_factor: Option<f64>,

    /// Orchestrator API base URL
    #[arg(long, global = true, env = "BERTH_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// File containing a bearer token
    #[arg(long, global = true, env = "BERTH_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Additional PEM CA certificate to trust
    #[arg(long, global = true, env = "BERTH_CA_CERT")]
    ca_cert: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "BERTH_LOG_JSON")]
    log_json: bool,
}

impl Settings {
    /// Config file (or defaults) with command-line and environment overrides
    fn scheduler_config(&self) -> miette::Result<SchedulerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading scheduler configuration from {}", path.display());
                SchedulerConfig::from_yaml_file(path)?
            }
            None => SchedulerConfig::default(),
        };

        if let Some(name) = &self.scheduler_name {
            config.scheduler_name = name.clone();
        }
        if let Some(secs) = self.watch_timeout_secs {
            config.watch_timeout_secs = secs;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_delay_ms = ms;
        }

        let weights = &mut config.scoring;
        for (slot, value) in [
            (&mut weights.alpha, self.alpha),
            (&mut weights.beta, self.beta),
            (&mut weights.gamma, self.gamma),
            (&mut weights.cpu_factor, self.cpu_factor),
            (&mut weights.memory_factor, self.memory_factor),
        ] {
            if let Some(value) = value {
                *slot = value;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.api_url.clone(),
            token_file: self.token_file.clone(),
            ca_cert: self.ca_cert.clone(),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.settings.log_json);

    let config = cli.settings.scheduler_config()?;
    let client = Arc::new(ApiClient::from_config(&cli.settings.client_config())?);

    match cli.command {
        Commands::Run => run(config, client).await,
        Commands::Explain { pod } => explain(config, client, &pod).await,
    }
}

/// Run the watch controller until interrupted
async fn run(config: SchedulerConfig, client: Arc<ApiClient>) -> miette::Result<()> {
    info!(
        "Starting berth scheduler '{}' against {}",
        config.scheduler_name,
        client.base_url()
    );

    let scheduler = Scheduler::new(client.clone(), client.clone(), config.scoring);
    let controller = WatchController::new(scheduler, client, config);

    let token = CancellationToken::new();
    let controller_token = token.clone();
    let controller_handle = tokio::spawn(async move {
        controller.run(controller_token).await;
    });

    tokio::signal::ctrl_c()
        .await
        .into_diagnostic()?;

    info!("Shutting down gracefully...");
    token.cancel();

    let shutdown_timeout = std::time::Duration::from_secs(5);
    match tokio::time::timeout(shutdown_timeout, controller_handle).await {
        Ok(Ok(())) => info!("Shutdown complete"),
        Ok(Err(e)) => error!("Watch controller task failed: {}", e),
        Err(_) => warn!("Watch controller did not stop within {:?}", shutdown_timeout),
    }

    Ok(())
}

/// Print each node's verdict for a pod manifest and the node that would win
async fn explain(
    config: SchedulerConfig,
    client: Arc<ApiClient>,
    manifest: &std::path::Path,
) -> miette::Result<()> {
    let text = std::fs::read_to_string(manifest).into_diagnostic()?;
    let pod: Pod = berth_core::from_yaml(&text)?;
    let pod = PodInfo::from_pod(&pod)?;

    let scheduler = Scheduler::new(client.clone(), client, config.scoring);
    let nodes = scheduler.fetch_nodes().await?;

    println!("Pod {} (QoS {})", pod.key(), pod.qos_class());
    for evaluation in scheduler.evaluate(&pod, &nodes) {
        match (&evaluation.score, &evaluation.failed_predicate) {
            (Some(score), _) => println!(
                "  {:<24} eligible  score={:.3} resource_cost={:.1} saturation={:.3}",
                evaluation.node_name, score.score, score.resource_cost, score.saturation
            ),
            (None, predicate) => println!(
                "  {:<24} rejected  {}: {}",
                evaluation.node_name,
                predicate.as_deref().unwrap_or("unknown"),
                evaluation.reason.as_deref().unwrap_or("")
            ),
        }
    }

    match scheduler.select_node(&pod, &nodes) {
        Some(decision) => println!(
            "Would bind to {} (score {:.3})",
            decision.node_name, decision.score
        ),
        None => println!("No eligible node; the pod would stay pending"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("berth").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&["run", "--scheduler-name", "edge", "--alpha", "2.5", "--retry-delay-ms", "100"]);
        let config = cli.settings.scheduler_config().unwrap();

        assert_eq!(config.scheduler_name, "edge");
        assert_eq!(config.retry_delay_ms, 100);
        assert_eq!(config.scoring.alpha, 2.5);
        assert_eq!(config.scoring.beta, 0.3);
        assert_eq!(config.watch_timeout_secs, 10);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = parse(&["run", "--watch-timeout-secs", "0"]);
        assert!(cli.settings.scheduler_config().is_err());
    }

    #[test]
    fn test_explain_requires_pod() {
        assert!(Cli::try_parse_from(["berth", "explain"]).is_err());
        let cli = parse(&["explain", "--pod", "pod.yaml"]);
        assert!(matches!(cli.command, Commands::Explain { .. }));
        assert_eq!(cli.settings.api_url, DEFAULT_API_URL);
    }
}
