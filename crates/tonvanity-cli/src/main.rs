//! TonVanity CLI
//!
//! Vanity address generator for TON wallets.

mod deeplink;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tonvanity_core::{
    calculate_difficulty, derive_address, EngineConfig, JobManager, MatchKind, ProgressSnapshot,
    SearchRequest, SessionEvent, SessionId, StopReason, VanityResult, WalletTemplate,
};
use tonvanity_crypto::{hex, Ed25519Keypair};
use tonvanity_pattern::{format_attempts, format_duration, prefix_reachable};
use tonvanity_wallet::{Address, AddressFlags, WalletContract};

#[derive(Parser)]
#[command(name = "tonvanity")]
#[command(author = "TonVanity Team")]
#[command(version = "0.1.0")]
#[command(about = "Vanity address generator for TON wallets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a vanity address
    Generate {
        /// Hex pattern to search for (3-6 characters)
        #[arg(short, long)]
        pattern: String,

        /// Where the pattern must appear
        #[arg(short = 't', long, default_value = "prefix")]
        match_kind: MatchKindArg,

        /// Match letters exactly instead of ignoring case
        #[arg(short = 's', long)]
        case_sensitive: bool,

        /// Wallet template
        #[arg(short = 'w', long, default_value = "v4r2")]
        template: TemplateArg,

        /// Number of workers (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,

        /// Attempts per worker before it gives up
        #[arg(long)]
        max_attempts: Option<u64>,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-derive an address from a hex seed or secret key
    Derive {
        /// 32-byte seed or 64-byte secret key, hex
        #[arg(long)]
        secret: String,

        /// Wallet template
        #[arg(short = 'w', long, default_value = "v4r2")]
        template: TemplateArg,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode an address and print all of its forms
    Address {
        /// Raw (`0:<hex>`) or user-friendly address
        address: String,
    },

    /// List supported wallet templates
    Templates,

    /// Build a TON Connect deep link
    Deeplink {
        /// Name of the app requesting the connection
        #[arg(long)]
        app_name: String,

        /// Wallet address to connect
        #[arg(long)]
        wallet_address: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchKindArg {
    Prefix,
    Suffix,
    Contains,
}

impl From<MatchKindArg> for MatchKind {
    fn from(arg: MatchKindArg) -> Self {
        match arg {
            MatchKindArg::Prefix => MatchKind::Prefix,
            MatchKindArg::Suffix => MatchKind::Suffix,
            MatchKindArg::Contains => MatchKind::Contains,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateArg {
    V4r2,
    Simple,
}

impl From<TemplateArg> for WalletTemplate {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::V4r2 => WalletTemplate::V4R2,
            TemplateArg::Simple => WalletTemplate::Simple,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            pattern,
            match_kind,
            case_sensitive,
            template,
            workers,
            max_attempts,
            config,
            json,
        } => {
            let config = load_config(config.as_deref(), workers, max_attempts)?;
            let request =
                SearchRequest::new(pattern, match_kind.into(), case_sensitive, template.into());
            cmd_generate(config, request, json)?;
        }
        Commands::Derive {
            secret,
            template,
            json,
        } => {
            cmd_derive(&secret, template.into(), json)?;
        }
        Commands::Address { address } => {
            cmd_address(&address)?;
        }
        Commands::Templates => {
            cmd_templates();
        }
        Commands::Deeplink {
            app_name,
            wallet_address,
        } => {
            let link = deeplink::ton_connect_link(&app_name, &wallet_address)?;
            println!("{}", link);
        }
    }

    Ok(())
}

/// File settings first, then command-line overrides
fn load_config(
    path: Option<&std::path::Path>,
    workers: Option<usize>,
    max_attempts: Option<u64>,
) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json(&json)?
        }
        None => EngineConfig::default(),
    };

    if let Some(workers) = workers {
        config.num_workers = if workers == 0 { num_cpus::get() } else { workers };
    }
    if let Some(max_attempts) = max_attempts {
        config.max_attempts_per_worker = max_attempts;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_generate(config: EngineConfig, request: SearchRequest, json_output: bool) -> Result<()> {
    request.validate()?;
    if let Some(warning) = unreachable_warning(&request) {
        tracing::warn!("{}", warning);
    }

    if !json_output {
        eprintln!("TonVanity v0.1.0");
        eprintln!("Template: {}", request.template.contract().name());
        eprintln!(
            "Pattern: {} ({}{})",
            request.pattern,
            request.match_kind,
            if request.case_sensitive { ", case-sensitive" } else { "" }
        );
        eprintln!("Workers: {}", config.num_workers);
        eprintln!(
            "Difficulty: {:.0}",
            calculate_difficulty(&request.pattern, request.match_kind, request.case_sensitive)
        );
        eprintln!();
    }

    let manager = Arc::new(JobManager::new(config)?);
    let session = SessionId::from("cli");
    let events = manager.connect(session.clone());

    {
        let manager = manager.clone();
        let session = session.clone();
        ctrlc::set_handler(move || manager.stop_generation(&session))
            .context("Failed to install Ctrl-C handler")?;
    }

    manager.start(&session, request)?;

    let outcome = loop {
        match events.recv()? {
            SessionEvent::Progress(snapshot) => {
                if !json_output {
                    print_status(&snapshot);
                }
            }
            SessionEvent::Found(result) => break Ok(result),
            SessionEvent::Stopped { reason } => break Err(reason),
            SessionEvent::Error { message } => {
                tracing::warn!("{}", message);
            }
        }
    };

    if !json_output {
        eprintln!();
    }

    match outcome {
        Ok(result) => {
            if json_output {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Err(reason) => {
            let message = match reason {
                StopReason::Requested => "Search stopped",
                StopReason::Exhausted => "No match found within limits",
                StopReason::Failed => "All workers failed",
            };
            if json_output {
                println!("{}", serde_json::json!({ "error": message }));
            } else {
                eprintln!("{}.", message);
            }
        }
    }

    Ok(())
}

/// Prefix patterns that no workchain-0 address can start with
fn unreachable_warning(request: &SearchRequest) -> Option<String> {
    if request.match_kind != MatchKind::Prefix
        || prefix_reachable(&request.pattern, request.case_sensitive)
    {
        return None;
    }
    Some(format!(
        "Prefix '{}' can never match: addresses continue with A-D after the tag. \
         The search will run until every worker hits its attempt limit.",
        request.pattern
    ))
}

fn print_status(snapshot: &ProgressSnapshot) {
    let eta = match snapshot.estimated_time_seconds {
        Some(secs) => format_duration(secs as f64),
        None => "unknown".to_string(),
    };
    eprint!(
        "\r{} attempts | {}/s | ETA {}        ",
        format_attempts(snapshot.attempts),
        format_attempts(snapshot.attempts_per_second),
        eta
    );
    let _ = std::io::stderr().flush();
}

fn print_result(result: &VanityResult) {
    println!();
    println!("MATCH FOUND!");
    println!("{:-<60}", "");
    println!("Address:     {}", result.address);
    println!("Public Key:  {}", result.public_key);
    println!("Secret Key:  {}", result.secret_key);
    println!("Template:    {}", result.template);
    println!("{:-<60}", "");
    println!("Attempts:    {}", result.attempts);
    println!("Time:        {}", format_duration(result.time_taken));
    println!("State Init:  {}", result.state_init);
}

fn cmd_derive(secret: &str, template: WalletTemplate, json_output: bool) -> Result<()> {
    let bytes = hex::decode(secret.trim().trim_start_matches("0x"))
        .context("Secret must be hex")?;
    let keypair = Ed25519Keypair::from_secret_bytes(&bytes)?;
    let derived = derive_address(&keypair.public_key_bytes(), template)?;

    let non_bounceable = derived.address.to_user_friendly(AddressFlags {
        bounceable: false,
        testnet: false,
    });

    if json_output {
        let out = serde_json::json!({
            "address": derived.friendly,
            "nonBounceable": non_bounceable,
            "raw": derived.address.to_raw(),
            "publicKey": hex::encode(keypair.public_key_bytes()),
            "walletType": template,
            "stateInit": derived.state_init_boc(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Address:        {}", derived.friendly);
        println!("Non-bounceable: {}", non_bounceable);
        println!("Raw:            {}", derived.address.to_raw());
        println!("Public Key:     {}", hex::encode(keypair.public_key_bytes()));
        println!("Template:       {}", template);
        println!("State Init:     {}", derived.state_init_boc());
    }

    Ok(())
}

fn cmd_address(input: &str) -> Result<()> {
    let input = input.trim();
    let (address, flags) = if input.contains(':') {
        (input.parse::<Address>()?, None)
    } else {
        let (address, flags) = Address::parse_user_friendly(input)?;
        (address, Some(flags))
    };

    println!("Raw:            {}", address.to_raw());
    if let Some(flags) = flags {
        println!("Bounceable:     {}", flags.bounceable);
        println!("Testnet:        {}", flags.testnet);
    }
    for (label, bounceable, testnet) in [
        ("Mainnet bounce", true, false),
        ("Mainnet plain", false, false),
        ("Testnet bounce", true, true),
        ("Testnet plain", false, true),
    ] {
        println!(
            "{:<15} {}",
            format!("{}:", label),
            address.to_user_friendly(AddressFlags { bounceable, testnet })
        );
    }

    Ok(())
}

fn cmd_templates() {
    println!("Wallet Templates:");
    println!("{:-<60}", "");
    println!("{:<10} {:<20} {}", "Id", "Name", "Code");
    println!("{:-<60}", "");

    for template in WalletTemplate::all() {
        let contract = template.contract();
        println!(
            "{:<10} {:<20} {}",
            template.id(),
            contract.name(),
            contract.code_version()
        );
    }
}
