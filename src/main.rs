use anyhow::Context;
use clap::{Parser, Subcommand};

use ai_tools::config::ToolsConfig;
use ai_tools::context::ToolContext;
use ai_tools::tools::ToolRegistry;

/// Inspect and invoke the tools an agent session would see.
#[derive(Parser, Debug)]
#[command(name = "ai-tools")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print metadata for every registered tool as JSON
    List,
    /// Print fully qualified tool names for allow-listing
    Names,
    /// Invoke one tool and print its result as JSON
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ToolsConfig::from_env().context("Invalid configuration")?;
    let registry = ToolRegistry::new(config);

    let init = registry.initialize().await;
    for error in &init.errors {
        eprintln!("   Warning: {}", error);
    }

    match args.command {
        Command::List => {
            let tools = registry.list_tools().await;
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Command::Names => {
            for name in registry.allowed_tool_names().await {
                println!("{}", name);
            }
        }
        Command::Call { tool, args } => {
            let params: serde_json::Value =
                serde_json::from_str(&args).context("Arguments must be valid JSON")?;
            if !params.is_object() {
                anyhow::bail!("Arguments must be a JSON object");
            }

            let ctx = ToolContext::default();
            let result = registry.invoke(&tool, params, &ctx).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.is_error() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
