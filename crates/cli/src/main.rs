use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookshelf command line
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Book catalog service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create the database file and every module's tables, then exit
    InitDb,
    /// Print the effective configuration as JSON
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Serve { port } => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            if let Some(port) = port {
                settings.server.port = port;
            }
            bookshelf_app::run(&settings).await
        }
        Command::InitDb => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let app = bookshelf_app::App::open(&settings).await?;
            tracing::info!(
                path = %settings.database.path,
                tables = app.registry.collect_schema().len(),
                "database initialized"
            );
            println!("initialized {}", settings.database.path);
            Ok(())
        }
        Command::ShowConfig => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}
