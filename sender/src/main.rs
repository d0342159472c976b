use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use sender::config::{mask_key, ConfigStore, Settings, DEFAULT_DEBOUNCE_MS};
use sender::samples::{default_template, find_sample, invalid_payloads, sample_payloads};
use sender::synth::{synthesize, synthesize_from_text};
use sender::{
    ConnectionMonitor, Dispatcher, History, HttpTransport, ProbeEngine, ReqwestTransport,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sender", about = "Send synthetic tracker telemetry to a webhook ingestion API")]
struct Cli {
    /// Submission endpoint, overrides the stored value
    #[arg(long, env = "SENDER_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Bearer API key, overrides the stored value
    #[arg(long, env = "SENDER_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Location of the stored endpoint/key pair
    #[arg(long, env = "SENDER_CONFIG_FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Request timeout. No timeout unless set.
    #[arg(long, env = "SENDER_TIMEOUT_MS", global = true)]
    timeout_ms: Option<u64>,

    /// Quiet period before probes re-run after an input change
    #[arg(long, env = "SENDER_DEBOUNCE_MS", default_value_t = DEFAULT_DEBOUNCE_MS, global = true)]
    debounce_ms: u64,

    /// Keep at most this many history entries
    #[arg(long, env = "SENDER_HISTORY_LIMIT", global = true)]
    history_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List catalog templates
    Samples,
    /// Print a synthesized record
    Generate(TemplateArgs),
    /// Submit records to the endpoint
    Send(SendArgs),
    /// Probe endpoint reachability and API key validity
    Check,
    /// Interactive mode: edit endpoint/key on stdin and watch probe state
    Watch,
    /// Manage the stored endpoint and key
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Args)]
struct TemplateArgs {
    /// Catalog entry to start from
    #[arg(long, conflicts_with = "file")]
    sample: Option<String>,

    /// JSON file to start from
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SendArgs {
    #[command(flatten)]
    template: TemplateArgs,

    /// Randomize the template before each submission
    #[arg(long)]
    random: bool,

    /// Number of sequential submissions
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Pause between submissions
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Stop at the first failed submission
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective endpoint and masked key
    Show,
    /// Persist the effective endpoint and key
    Save,
    /// Reset to the default endpoint and an empty key
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = match &cli.config_file {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_location()?,
    };
    let stored = store
        .load()
        .with_context(|| format!("reading {}", store.path().display()))?;
    let settings = Settings::resolve(
        stored,
        cli.endpoint.clone(),
        cli.api_key.clone(),
        cli.timeout_ms,
        cli.debounce_ms,
        cli.history_limit,
    );

    match cli.command {
        Command::Samples => list_samples(),
        Command::Generate(args) => generate(&args)?,
        Command::Send(args) => send(&settings, &args).await?,
        Command::Check => check(&settings).await?,
        Command::Watch => watch(&settings, &store).await?,
        Command::Config { action } => manage_config(&settings, &store, action)?,
    }

    Ok(())
}

fn list_samples() {
    println!("Samples:");
    for sample in sample_payloads() {
        println!("  {:<24} {}", sample.name, sample.description);
    }
    println!("Invalid samples:");
    for sample in invalid_payloads() {
        println!("  {:<24} {}", sample.name, sample.description);
    }
}

/// Template text from --sample / --file, or None for the default template
fn template_text(args: &TemplateArgs) -> anyhow::Result<Option<String>> {
    if let Some(name) = &args.sample {
        let sample = find_sample(name).with_context(|| format!("unknown sample '{}'", name))?;
        return Ok(Some(serde_json::to_string(&sample.payload)?));
    }
    if let Some(path) = &args.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok(Some(text));
    }
    Ok(None)
}

fn generate(args: &TemplateArgs) -> anyhow::Result<()> {
    let record = match template_text(args)? {
        Some(text) => synthesize_from_text(&text)?,
        None => synthesize(default_template()),
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn transport(settings: &Settings) -> anyhow::Result<Arc<dyn HttpTransport>> {
    Ok(Arc::new(ReqwestTransport::new(settings.timeout)?))
}

async fn send(settings: &Settings, args: &SendArgs) -> anyhow::Result<()> {
    let template = template_text(&args.template)?;
    // without a template or --random there is nothing to send verbatim
    let random = args.random || template.is_none();

    let history = Arc::new(History::with_limit(settings.history_limit));
    let dispatcher = Dispatcher::new(transport(settings)?, history.clone());

    info!(
        "Sending {} record(s) to {} (key {})",
        args.repeat,
        settings.endpoint,
        mask_key(&settings.api_key)
    );

    for n in 0..args.repeat {
        let text = match (&template, random) {
            (Some(text), false) => text.clone(),
            (Some(text), true) => serde_json::to_string(&synthesize_from_text(text)?)?,
            (None, _) => serde_json::to_string(&synthesize(default_template()))?,
        };

        let result = dispatcher
            .dispatch(&settings.endpoint, &settings.api_key, &text)
            .await?;
        println!("{}", serde_json::to_string_pretty(&result)?);

        if args.fail_fast {
            result.into_result()?;
        }
        if n + 1 < args.repeat && args.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    let (ok, failed) = history.tally();
    info!("Done: {} accepted, {} failed", ok, failed);
    if failed > 0 {
        bail!("{} of {} submissions failed", failed, ok + failed);
    }
    Ok(())
}

async fn check(settings: &Settings) -> anyhow::Result<()> {
    let engine = ProbeEngine::new(transport(settings)?);
    let (reachability, credential) = tokio::join!(
        engine.probe_reachability(&settings.endpoint),
        engine.probe_credential(&settings.endpoint, &settings.api_key),
    );

    println!("Endpoint: {}", settings.endpoint);
    println!("  API:     {}", reachability);
    println!("  API key: {}", credential);
    if !reachability.is_connected() {
        bail!("Endpoint {} is not reachable", settings.endpoint);
    }
    Ok(())
}

async fn watch(settings: &Settings, store: &ConfigStore) -> anyhow::Result<()> {
    let engine = ProbeEngine::new(transport(settings)?);
    let monitor = ConnectionMonitor::new(engine, settings.quiet_period);
    let mut reachability = monitor.reachability();
    let mut credential = monitor.credential();

    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = reachability.changed() => {
                    if changed.is_err() { break; }
                    println!("API:     {}", *reachability.borrow_and_update());
                }
                changed = credential.changed() => {
                    if changed.is_err() { break; }
                    println!("API key: {}", *credential.borrow_and_update());
                }
            }
        }
    });

    let mut endpoint = settings.endpoint.clone();
    let mut api_key = settings.api_key.clone();
    monitor.update(&endpoint, &api_key);

    println!("Commands: endpoint <url> | key <value> | test | status | save | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "endpoint" => {
                endpoint = rest.trim().to_string();
                monitor.update(&endpoint, &api_key);
            }
            "key" => {
                api_key = rest.trim().to_string();
                monitor.update(&endpoint, &api_key);
            }
            "test" => monitor.test_now(),
            "status" => {
                let (reach, cred) = monitor.current();
                println!(
                    "{} | key {} | API {} | API key {}{}",
                    endpoint,
                    mask_key(&api_key),
                    reach,
                    cred,
                    if monitor.is_settling() { " (pending)" } else { "" }
                );
            }
            "save" => {
                let mut stored = settings.stored();
                stored.endpoint = endpoint.clone();
                stored.api_key = api_key.clone();
                if let Err(e) = store.save(&stored) {
                    error!("Failed to save config: {}", e);
                }
            }
            "quit" | "exit" => break,
            "" => {}
            other => println!("Unknown command: {}", other),
        }
    }

    monitor.cancel_pending();
    printer.abort();
    Ok(())
}

fn manage_config(
    settings: &Settings,
    store: &ConfigStore,
    action: ConfigAction,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("Config file: {}", store.path().display());
            println!("Endpoint:    {}", settings.endpoint);
            println!("API key:     {}", mask_key(&settings.api_key));
        }
        ConfigAction::Save => {
            store.save(&settings.stored())?;
            println!("Saved to {}", store.path().display());
        }
        ConfigAction::Clear => {
            let cleared = store.clear()?;
            println!("Reset endpoint to {} and cleared API key", cleared.endpoint);
        }
    }
    Ok(())
}
