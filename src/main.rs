use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use courier::api::{ApiServer, ApiState};
use courier::channels::{ChatId, TelegramChannel, Target};
use courier::plugins::Context;
use courier::tools::build_client;
use courier::{Config, Error, PluginManager, delivery};

/// Courier - plugin host for chat bots
#[derive(Parser)]
#[command(name = "courier", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the function-calling HTTP API
    Serve {
        /// Port to listen on (overrides `COURIER_PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the call specs of every loaded operation
    Specs,
    /// Invoke one operation and print its envelope
    Call {
        /// Operation name, e.g. `search_arxiv`
        operation: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,
        /// Also deliver the envelope to this Telegram chat (id or @username)
        #[arg(long)]
        deliver_to: Option<String>,
        /// Reply to this message when delivering
        #[arg(long, requires = "deliver_to")]
        reply_to: Option<i64>,
        /// Forum topic to deliver into
        #[arg(long, requires = "deliver_to")]
        thread_id: Option<i64>,
        /// User id checked by user-restricted operations
        #[arg(long)]
        user_id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise verbosity picks the level
    let filter = match cli.verbose {
        0 => "info,courier=info",
        1 => "info,courier=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().context("invalid configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let plugins = PluginManager::from_config(&config).context("failed to load plugins")?;
    tracing::info!(
        plugins = plugins.len(),
        operations = plugins.specs().len(),
        "plugins loaded"
    );

    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let state = ApiState::new(plugins).with_api_key(config.server.api_key.clone());
            ApiServer::new(state, port).run().await?;
        }
        Command::Specs => {
            let specs: Vec<_> = plugins.specs().into_iter().map(|s| s.to_schema()).collect();
            println!("{}", serde_json::to_string_pretty(&specs)?);
        }
        Command::Call {
            operation,
            arguments,
            deliver_to,
            reply_to,
            thread_id,
            user_id,
        } => {
            let mut context = Context::new();
            context.user_id = user_id;

            let envelope = plugins.call(&operation, context, &arguments).await;
            println!("{}", serde_json::to_string_pretty(&envelope.to_json())?);

            if let Some(chat) = deliver_to {
                let token = config
                    .telegram
                    .token
                    .clone()
                    .ok_or_else(|| Error::missing_setting("TELEGRAM_BOT_TOKEN"))?;
                let channel = TelegramChannel::new(
                    token,
                    build_client(&config.http)?,
                    &config.endpoints.telegram,
                );
                let target = Target {
                    chat: ChatId::from(chat.as_str()),
                    reply_to,
                    thread_id,
                };

                let report = delivery::deliver(&channel, &target, &envelope).await?;
                tracing::info!(sent = report.sent, failed = report.failed, "delivered");
            }
        }
    }

    Ok(())
}
