//! Text2SQL CLI: run the HTTP service or generate SQL from the shell.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use text2sql::otel::init_tracing;
use text2sql::{serve, AppState, Config, RouteName, SchemaDescription};

#[derive(Parser)]
#[command(name = "text2sql")]
#[command(about = "Natural-language questions to SQL", long_about = None)]
struct Cli {
    /// YAML config file (default: config/local.yaml if present)
    #[arg(long, global = true, env = "TEXT2SQL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate SQL for one question and print it
    Generate {
        /// Natural language question
        question: String,

        /// JSON schema file
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Route whose backend and prompt format are used
        #[arg(long, default_value = "simple")]
        route: String,
    },

    /// Download model files from the Hugging Face hub
    Download {
        /// Hub model id
        #[arg(long, default_value = "cssupport/t5-small-awesome-text-to-sql")]
        model_id: String,

        /// Output directory
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing("text2sql")?;

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await?;
        }

        Commands::Generate {
            question,
            schema,
            route,
        } => {
            let route: RouteName = route.parse()?;
            let schema = match schema {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("cannot read schema file {}", path.display()))?;
                    let value: serde_json::Value = serde_json::from_str(&raw)
                        .with_context(|| format!("invalid JSON in {}", path.display()))?;
                    Some(SchemaDescription::from_value(&value))
                }
                None => None,
            };

            let config = Config::load(cli.config.as_deref())?;
            let backend = route.binding(&config.routes).backend;
            if !config.has_backend(backend) {
                bail!("route {} needs the {} backend, which is not configured", route, backend.as_str());
            }
            let state = AppState::from_config(&config).await?;

            let generated = state.generate(route, &question, schema.as_ref()).await?;
            println!("{}", generated.sql);
            if let Some(confidence) = generated.confidence {
                eprintln!(
                    "confidence {:.4}, {:.2}s ({})",
                    confidence,
                    generated.elapsed.as_secs_f64(),
                    generated.backend.as_str()
                );
            }
        }

        Commands::Download { model_id, output } => {
            let output = PathBuf::from(shellexpand::tilde(&output.to_string_lossy()).into_owned());
            let files = tokio::task::spawn_blocking(move || {
                text2sql::llm::download(&model_id, &output)
            })
            .await??;
            for file in files {
                println!("{}", file.display());
            }
        }
    }

    Ok(())
}
