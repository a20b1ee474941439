use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf-cli", version, about = "Book rental ledger service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service until interrupted
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the resolved settings as JSON
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().with_context(|| "failed to load shelf settings")?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            shelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "shelf-cli serving");

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?
                .block_on(shelf_app::run(settings))
        }
        Command::Config => {
            let rendered =
                serde_json::to_string_pretty(&settings).context("failed to render settings")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}
