use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use webhook_ca_patcher::{load_ca_bundle, CaBundlePatcher, KubeStore, WebhookConfiguration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a CA bundle into a webhook configuration
    Patch(PatchArgs),
    /// Show version information
    Version,
}

#[derive(Parser, Debug)]
struct PatchArgs {
    /// Name of the webhook configuration resource
    #[arg(long = "config", env = "WEBHOOK_CONFIG_NAME")]
    config_name: String,

    /// Name of the webhook entry (or entries) to patch
    #[arg(long = "webhook", env = "WEBHOOK_NAME")]
    webhook_name: String,

    /// Path to the PEM-encoded CA bundle
    #[arg(long, env = "CA_BUNDLE_FILE")]
    ca_file: PathBuf,

    /// Kind of webhook configuration
    #[arg(long, env = "WEBHOOK_KIND", value_enum, default_value_t = WebhookKind::Mutating)]
    kind: WebhookKind,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WebhookKind {
    Mutating,
    Validating,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("webhook-ca-patcher v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Patch(patch_args) => {
            init_tracing(args.log_format);
            run_patch(patch_args).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
    }
}

async fn run_patch(args: PatchArgs) -> anyhow::Result<()> {
    anyhow::ensure!(!args.config_name.is_empty(), "--config must not be empty");
    anyhow::ensure!(!args.webhook_name.is_empty(), "--webhook must not be empty");

    let ca_bundle = load_ca_bundle(&args.ca_file)
        .await
        .with_context(|| format!("failed to load CA bundle from {}", args.ca_file.display()))?;

    let client = kube::Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    match args.kind {
        WebhookKind::Mutating => {
            patch_with::<MutatingWebhookConfiguration>(client, &args, &ca_bundle).await
        }
        WebhookKind::Validating => {
            patch_with::<ValidatingWebhookConfiguration>(client, &args, &ca_bundle).await
        }
    }
}

async fn patch_with<K: WebhookConfiguration>(
    client: kube::Client,
    args: &PatchArgs,
    ca_bundle: &[u8],
) -> anyhow::Result<()> {
    let patcher = CaBundlePatcher::new(KubeStore::<K>::new(client));
    patcher
        .patch(&args.config_name, &args.webhook_name, ca_bundle)
        .await
        .with_context(|| {
            format!(
                "failed to patch {:?} webhook configuration {}",
                args.kind, args.config_name
            )
        })?;

    info!(
        "CA bundle installed into webhook {} of {}",
        args.webhook_name, args.config_name
    );
    Ok(())
}
