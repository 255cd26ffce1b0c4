use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use spernet_bot::application::conversation::ConversationRouter;
use spernet_bot::application::messaging::{deliver, Inbound, MessageDispatcher, MessageParser};
use spernet_bot::application::services::NotifyService;
use spernet_bot::domain::entities::SenderId;
use spernet_bot::domain::traits::{Bot, ConfigStore, PanelChecker};
use spernet_bot::infrastructure::adapters::console::ConsoleAdapter;
use spernet_bot::infrastructure::adapters::telegram::TelegramAdapter;
use spernet_bot::infrastructure::config::Config;
use spernet_bot::infrastructure::panel::HttpPanelChecker;
use spernet_bot::infrastructure::storage::JsonConfigStore;

/// How long a sender's worker waits for another message before exiting
const WORKER_IDLE: Duration = Duration::from_secs(60);

const ONLINE_NOTICE: &str = "🟢 <b>Spernet bot is online.</b>\nSend /start to open the menu.";

#[derive(Parser)]
#[command(name = "spernet-bot")]
#[command(about = "Admin bot for the Spernet IP limiter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run_bot(cli.config, cli.token);
        }
        Commands::Version => {
            println!("spernet-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> Config {
    let mut config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();
    config
}

fn run_bot(config_path: String, token_override: Option<String>) {
    let config = load_config(&config_path);
    tracing::info!("Starting {}", config.bot.name);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(async move {
        let store = match JsonConfigStore::open(&config.store.path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!("Failed to open {}: {}", config.store.path.display(), e);
                std::process::exit(1);
            }
        };
        tracing::info!("Config record at {}", config.store.path.display());

        let panel: Arc<dyn PanelChecker> = match HttpPanelChecker::new(Duration::from_secs(
            config.panel.request_timeout_secs,
        )) {
            Ok(checker) => Arc::new(checker),
            Err(e) => {
                tracing::error!("Failed to build panel client: {}", e);
                std::process::exit(1);
            }
        };

        let router = Arc::new(ConversationRouter::new(store.clone(), panel, config.idle_timeout()));
        spawn_session_sweeper(router.clone(), config.sweep_interval());

        let stored_token = match store.bot_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Could not read BOT_TOKEN from the config record: {}", e);
                None
            }
        };

        match token_override
            .or_else(|| config.telegram.token.clone())
            .or(stored_token)
        {
            Some(token) => {
                let mut bot = TelegramAdapter::new(token);

                // Register bot commands with Telegram
                if let Err(e) = bot.register_commands().await {
                    tracing::warn!("Failed to register commands: {}", e);
                }

                if let Err(e) = bot.fetch_bot_info().await {
                    tracing::error!("Failed to fetch bot info: {}", e);
                    return;
                }

                run_telegram_bot(Arc::new(bot), router, store, &config).await;
            }
            None => {
                // Run console bot (dev mode)
                run_console_bot(ConsoleAdapter::new(), router, &config).await;
            }
        }
    });
}

fn spawn_session_sweeper(router: Arc<ConversationRouter>, interval: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        loop {
            tick.tick().await;
            let dropped = router.sessions().sweep();
            if dropped > 0 {
                tracing::debug!(
                    "Dropped {} idle sessions, {} still open",
                    dropped,
                    router.sessions().active_count()
                );
            }
        }
    });
}

async fn run_telegram_bot(
    bot: Arc<TelegramAdapter>,
    router: Arc<ConversationRouter>,
    store: Arc<JsonConfigStore>,
    config: &Config,
) {
    if let Err(e) = bot.start().await {
        tracing::error!("Failed to start bot: {}", e);
        return;
    }

    let info = bot.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    let parser = MessageParser::new(config.bot.prefix.clone()).with_bot_username(info.username);

    if config.telegram.notify_admins_on_start {
        let store: Arc<dyn ConfigStore> = store;
        match NotifyService::new(bot.clone(), store).broadcast(ONLINE_NOTICE).await {
            Ok(count) => tracing::info!("Announced startup to {} admins", count),
            Err(e) => tracing::warn!("Failed to announce startup: {}", e),
        }
    }

    let mut dispatcher = MessageDispatcher::new(bot.clone(), router, WORKER_IDLE);
    let mut offset: i64 = 0;
    let timeout_seconds = config.telegram.poll_timeout_secs;

    tracing::info!("Starting message loop...");

    loop {
        match bot.get_updates(offset, timeout_seconds).await {
            Ok(updates) => {
                if !updates.is_empty() {
                    tracing::info!("Received {} updates", updates.len());
                }

                for update in &updates {
                    let Some(msg) = &update.message else { continue };
                    let Some(text) = &msg.text else { continue };
                    let message = parser.parse(msg.sender(), text.as_str()).with_platform("telegram");
                    dispatcher.dispatch(Inbound { chat: SenderId(msg.chat.id), message });
                }
                let running = dispatcher.prune();
                if !updates.is_empty() {
                    tracing::debug!("{} sender workers running", running);
                }

                // Update offset
                if let Some(next) = TelegramAdapter::get_next_offset(&updates) {
                    offset = next;
                }
            }
            Err(e) => {
                tracing::error!("Failed to get updates: {}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

async fn run_console_bot(bot: ConsoleAdapter, router: Arc<ConversationRouter>, config: &Config) {
    if let Err(e) = bot.start().await {
        tracing::error!("Failed to start bot: {}", e);
        return;
    }

    let info = bot.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    let sender = SenderId(config.console.sender_id);
    let parser = MessageParser::new(config.bot.prefix.clone());

    loop {
        let input = match bot.read_line().await {
            Ok(Some(input)) => input,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        };
        if input.is_empty() {
            continue;
        }

        let message = parser.parse(sender, input).with_platform("console");
        deliver(&bot, &router, Inbound { chat: sender, message }).await;
    }

    tracing::info!("Console input closed, shutting down");
}

fn init_config() {
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}
