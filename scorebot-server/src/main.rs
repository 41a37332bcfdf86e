use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use scorebot_core::BotConfig;

mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "scorebot")]
#[command(author, version, about = "ScoreBot - Twitch chat score predictions")]
pub struct Args {
    /// Mode: "run" or "auth"
    #[arg(long, default_value = "run")]
    mode: String,

    /// Channel (login name) to join in run mode
    #[arg(long)]
    channel: Option<String>,

    /// SQLite database file; overrides SQLITE_DB_PATH
    #[arg(long)]
    db_path: Option<String>,

    /// Credential file; overrides TOKEN_FILE
    #[arg(long)]
    token_file: Option<String>,

    /// Local port for the OAuth redirect in auth mode; also rewrites the
    /// redirect URI. Without it the port comes from TWITCH_REDIRECT_URI.
    #[arg(long)]
    callback_port: Option<u16>,
}

impl Args {
    fn apply_to(&self, config: &mut BotConfig) {
        if let Some(path) = &self.db_path {
            config.database_path = path.clone();
        }
        if let Some(path) = &self.token_file {
            config.token_file = path.into();
        }
        if let Some(port) = self.callback_port {
            config.use_callback_port(port);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("scorebot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {e}");
    }
}


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("ScoreBot starting. mode={}, channel={:?}", args.mode, args.channel);

    let mut config = BotConfig::from_env()?;
    args.apply_to(&mut config);

    match args.mode.as_str() {
        "run" => {
            if let Err(e) = server::run_bot(&args, config).await {
                error!("Bot error: {:?}", e);
                return Err(e.into());
            }
        }
        "auth" => {
            if let Err(e) = server::run_auth(config).await {
                error!("Auth error: {:?}", e);
                return Err(e.into());
            }
        }
        other => {
            error!("Invalid mode '{}'. Use --mode=run or --mode=auth.", other);
            anyhow::bail!("invalid mode '{other}'");
        }
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
