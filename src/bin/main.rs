use clap::{Parser, Subcommand};
use financial_advisor_agents::{
    agent::{build_agent_tree, DATA_ANALYST},
    config::AdvisorConfig,
    market_data::YahooFinanceSource,
    models::Content,
    state::{InMemorySessionStore, SessionStore},
    tools::FetchRealMarketDataTool,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "advisor", about = "Inspect and exercise the financial advisor agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the agent tree as JSON
    Agents,
    /// Fetch market data through the analyst's tool and its pre-tool hook
    Fetch { ticker: String },
    /// Run a fresh conversation's pre-agent and pre-model hooks for a message.
    /// A pre-agent reply ends the turn.
    Ask { text: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AdvisorConfig::from_env()?;

    info!(model = %config.model, base_url = %config.market_data.base_url, "Advisor agents starting");

    let source = Arc::new(YahooFinanceSource::new(&config.market_data)?);
    let root = build_agent_tree(&config, source);
    let sessions = InMemorySessionStore::new();

    match cli.command {
        Command::Agents => {
            println!("{}", serde_json::to_string_pretty(&root.summary())?);
        }
        Command::Fetch { ticker } => {
            let analyst = root
                .find_agent(DATA_ANALYST)
                .ok_or("data_analyst is not registered")?;

            let mut state = sessions.start().await?;
            let result = analyst
                .call_tool(
                    FetchRealMarketDataTool::NAME,
                    serde_json::json!({ "ticker": ticker }),
                    &mut state,
                )
                .await?;
            sessions.end(state.conversation_id).await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Ask { text } => {
            let mut state = sessions.start().await?;

            match root
                .preview_turn(DATA_ANALYST, &mut state, Content::user_text(text))
                .await?
            {
                Some(reply) => println!(
                    "[{}] {}",
                    reply.agent,
                    reply.content.first_text().unwrap_or_default()
                ),
                None => println!("[{}] no override, the model call would proceed", DATA_ANALYST),
            }

            sessions.save(&state).await?;
            sessions.end(state.conversation_id).await?;
        }
    }

    Ok(())
}
