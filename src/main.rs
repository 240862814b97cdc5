use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dossier::cli::GenerateOptions;
use dossier::config::{ConfigLoader, Precision};

#[derive(Parser)]
#[command(name = "dossier")]
#[command(
    version,
    about = "AI-driven use case document generator for GitHub repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a GitHub repository and generate a use case document
    Generate {
        #[arg(help = "GitHub repository URL")]
        url: String,
        #[arg(long, help = "Provider: gemini, claude, gemini-api, auto")]
        provider: Option<String>,
        #[arg(
            long,
            default_value = "high",
            help = "Precision: high (five-stage) or fast (single pass)"
        )]
        precision: Precision,
        #[arg(long, short, help = "Output directory for the document")]
        output: Option<PathBuf>,
    },

    /// Manage stored API credentials
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Encrypt and store a secret for a service
    Set {
        #[arg(help = "Service name, e.g. gemini")]
        service: String,
        #[arg(help = "Secret value")]
        secret: String,
        #[arg(long, env = "DOSSIER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print a stored secret
    Show {
        #[arg(help = "Service name, e.g. gemini")]
        service: String,
        #[arg(long, env = "DOSSIER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mDossier encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            url,
            provider,
            precision,
            output,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(dossier::cli::generate(GenerateOptions {
                url,
                provider,
                precision,
                output,
            }))?;
        }
        Commands::Key { action } => match action {
            KeyAction::Set {
                service,
                secret,
                password,
            } => {
                dossier::cli::key_set(&service, &secret, &SecretString::from(password))?;
            }
            KeyAction::Show { service, password } => {
                dossier::cli::key_show(&service, &SecretString::from(password))?;
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                ConfigLoader::show_config(json)?;
            }
            ConfigAction::Path => {
                println!("Configuration paths:");
                match ConfigLoader::global_config_path() {
                    Some(global) => {
                        let exists = if global.exists() { "✓" } else { "✗" };
                        println!("  Global:  {} {}", exists, global.display());
                    }
                    None => println!("  Global:  (not available)"),
                }
                let project = ConfigLoader::project_config_path();
                let exists = if project.exists() { "✓" } else { "✗" };
                println!("  Project: {} {}", exists, project.display());
                if let Some(keystore) = ConfigLoader::keystore_path() {
                    let exists = if keystore.exists() { "✓" } else { "✗" };
                    println!("  Keys:    {} {}", exists, keystore.display());
                }
            }
        },
    }

    Ok(())
}
