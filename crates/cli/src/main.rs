use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quiet")]
#[command(about = "Quiet Optimizer: Telegram webhook relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: QUIET_CONFIG_PATH or ~/.quiet/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook server. Replies are generated when OPENAI_API_KEY is set, otherwise picked from templates.
    Serve {
        /// Config file path (default: QUIET_CONFIG_PATH or ~/.quiet/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listening port (default from PORT, config, or 10000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the reply the bot would send for TEXT (no delivery, no rate limit).
    Reply {
        /// Config file path (default: QUIET_CONFIG_PATH or ~/.quiet/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Message text, e.g. "/anime"
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("quiet {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("server failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Reply { config, text }) => {
            if let Err(e) = run_reply(config, &text).await {
                log::error!("reply failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting server on {}:{} (config {})",
        config.gateway.bind,
        config.gateway.port,
        path.display()
    );
    lib::gateway::run_gateway(config).await
}

async fn run_reply(config_path: Option<std::path::PathBuf>, text: &str) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let components = lib::gateway::build_components(&config);
    let reply = components.resolver.resolve(text).await;
    println!("{}", reply);
    Ok(())
}
