use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use pushsync_client::{
    FileTokenStore, MessageDispatcher, PushClient, RegistrationMachine, TokenStore,
    config_from_env, format_state, resolve_store_dir,
};
use pushsync_sdk::{
    ClientConfig, DeviceToken, InboundMessage, PushPayload, PushServiceClient, WebSocketTransport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

mod console;
mod subscription_commands;

use console::{ConsolePresenter, ConsoleView, OfflineTransport};

#[derive(Parser)]
#[command(name = "pushsync")]
#[command(about = "Push registration and subscription sync client")]
struct Cli {
    /// Device registration service base URL
    #[arg(long, global = true)]
    reg_url: Option<String>,

    /// Subscription service base URL
    #[arg(long, global = true)]
    sub_url: Option<String>,

    /// Push transport WebSocket URL
    #[arg(long, global = true)]
    transport_url: Option<String>,

    /// Directory of the token preferences file
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Backend request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the push transport and process events until it closes
    Run {
        /// Repeat the register call for a stored token
        #[arg(long)]
        reregister: bool,
    },
    /// Show the stored device token
    Status,
    /// Store a token, register it and fetch subscriptions
    Register {
        /// Registration token issued by the push transport
        token: String,
    },
    /// Unregister the device from the backend and forget the token
    Unregister,
    /// Subscription management
    Subs {
        #[command(subcommand)]
        action: subscription_commands::SubscriptionAction,
    },
    /// Forget the stored token without contacting the backend
    Clear,
    /// Run a push payload through the local dispatcher
    Dispatch {
        /// Message body
        #[arg(short, long)]
        message: String,
        /// Badge count
        #[arg(short, long)]
        count: Option<String>,
        /// Sound marker
        #[arg(short, long)]
        sound: Option<String>,
        /// Message type ("raw" shows an alert)
        #[arg(short = 't', long = "type")]
        message_type: Option<String>,
    },
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = config_from_env().context("invalid environment configuration")?;

        if let Some(url) = &self.reg_url {
            config.registration_url = url.clone();
        }
        if let Some(url) = &self.sub_url {
            config.subscription_url = url.clone();
        }
        if let Some(url) = &self.transport_url {
            config.transport_url = url.clone();
        }
        if let Some(dir) = &self.store_dir {
            config.store_dir = Some(dir.clone());
        }
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                bail!("--timeout must be at least 1 second");
            }
            config.timeout_seconds = timeout;
        }
        if let Commands::Run { reregister: true } = self.command {
            config.reregister_on_start = true;
        }

        Ok(config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Machine for one-shot commands; it never waits for a transport token.
fn offline_machine(
    config: &ClientConfig,
    store: Arc<FileTokenStore>,
) -> anyhow::Result<RegistrationMachine> {
    let backend = PushServiceClient::from_config(config).context("invalid backend URL")?;
    Ok(RegistrationMachine::new(
        store,
        Arc::new(backend),
        Arc::new(OfflineTransport),
        Arc::new(ConsoleView),
    ))
}

fn require_token(store: &FileTokenStore) -> anyhow::Result<DeviceToken> {
    match store.get()? {
        Some(token) => Ok(token),
        None => bail!(
            "no device token stored in {}; run `pushsync run` or `pushsync register <token>` first",
            store.path().display()
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let store = Arc::new(FileTokenStore::new(resolve_store_dir(&config)));

    match cli.command {
        Commands::Run { .. } => {
            let backend = PushServiceClient::from_config(&config).context("invalid backend URL")?;
            let (transport, events) =
                WebSocketTransport::connect(&config.transport_url, &config.sender_id)
                    .await
                    .with_context(|| {
                        format!("failed to connect push transport at {}", config.transport_url)
                    })?;

            let mut client = PushClient::new(
                &config,
                store,
                Arc::new(backend),
                Arc::new(transport),
                Arc::new(ConsoleView),
                Arc::new(ConsolePresenter),
            );

            println!("🎧 Listening for push events on {}", config.transport_url);
            println!("   Press Ctrl+C to stop");
            tokio::select! {
                processed = client.run(events) => {
                    println!("🔌 Transport closed after {} events", processed);
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("👋 Stopping");
                }
            }
            println!("{}", format_state(&client.machine.state()));
        }
        Commands::Status => match store.get() {
            Ok(Some(token)) => {
                println!("✅ Device token stored: {}", token.redacted());
                println!("   File: {}", store.path().display());
            }
            Ok(None) => {
                println!("⚪ No device token stored");
                println!("   File: {}", store.path().display());
            }
            Err(e) => {
                eprintln!("❌ Failed to read token store: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Register { token } => {
            let Some(token) = DeviceToken::new(token) else {
                bail!("registration token must not be empty");
            };
            let mut machine = offline_machine(&config, store)?;
            let result = machine.handle_token(token).await;
            println!("{}", format_state(&machine.state()));
            result?;
        }
        Commands::Unregister => {
            require_token(&store)?;
            let mut machine = offline_machine(&config, store)?;
            if let Err(e) = machine.start().await {
                tracing::warn!(error = %e, "subscription fetch failed");
            }
            machine.unregister().await?;
            println!("🗑️  Device unregistered");
        }
        Commands::Subs { action } => {
            require_token(&store)?;
            let mut machine = offline_machine(&config, store)?;
            machine.start().await?;
            subscription_commands::handle_subscription_command(&mut machine, action).await?;
        }
        Commands::Clear => {
            store.clear()?;
            println!("🗑️  Device token cleared");
        }
        Commands::Dispatch {
            message,
            count,
            sound,
            message_type,
        } => {
            let payload = PushPayload {
                message: Some(message),
                count,
                sound,
                message_type,
            };
            let dispatcher = MessageDispatcher::new(Arc::new(ConsolePresenter));
            dispatcher.dispatch(&InboundMessage::from_payload(&payload));
        }
    }

    Ok(())
}
