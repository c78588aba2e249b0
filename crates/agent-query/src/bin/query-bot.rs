//! Finance query bot REPL
//!
//! # Usage
//!
//! ```bash
//! # With an OpenAI-compatible analyzer
//! export OPENAI_API_KEY="sk-..."
//! export OPENAI_API_BASE="http://localhost:1234/v1"   # optional
//!
//! cargo run --bin query-bot -p agent-query
//!
//! # Fully offline: fallback rules and fixed quotes
//! cargo run --bin query-bot -p agent-query -- --offline
//! ```

use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use agent_query::{
    ConversationState, FinanceBot, HistoryTurn, InMemoryMarketData, LlmAnalyzerConfig,
    LlmQueryAnalyzer, MarketDataProvider, QueryAnalyzer, QueryConfig, RequestContext, Response,
    UnavailableAnalyzer, YahooMarketData,
};
use agent_utils::{AppConfig, LogFormat, init_tracing_with};
use clap::Parser;
use comfy_table::{Table, presets::UTF8_FULL};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "query-bot")]
#[command(about = "Interactive finance assistant", long_about = None)]
struct Args {
    /// Session id (random when omitted)
    #[arg(short, long)]
    session: Option<String>,

    /// Use fixed in-memory quotes and skip the language model
    #[arg(long)]
    offline: bool,

    /// Log format: plain or json (overrides LOG_FORMAT)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Model name (overrides OPENAI_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Number of turns kept in the rolling history
    #[arg(long, default_value_t = 12)]
    history: usize,
}

const HELP: &str = "\
Commands:
  /state    show the conversation state
  /symbols  list the symbols discussed so far
  /clear    forget this session
  /help     show this help
  /exit     quit

Anything else is sent to the assistant, for example:
  NVDA price
  what's the trend?
  compare it with AMD
  show bitcoin chart";

fn build_analyzer(args: &Args) -> anyhow::Result<Arc<dyn QueryAnalyzer>> {
    if args.offline || env::var("OPENAI_API_KEY").is_err() {
        info!("No language model configured, using fallback rules only");
        return Ok(Arc::new(UnavailableAnalyzer));
    }

    let mut config = LlmAnalyzerConfig::from_env()?;
    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    info!(api_base = %config.api_base, model = %config.model, "Using LLM analyzer");
    Ok(Arc::new(LlmQueryAnalyzer::with_config(config)?))
}

fn build_market(args: &Args) -> Arc<dyn MarketDataProvider> {
    if args.offline {
        Arc::new(InMemoryMarketData::sample())
    } else {
        Arc::new(YahooMarketData::default())
    }
}

fn print_response(response: &Response) {
    println!("[{}] {}", response.kind(), response.text());
    if response.needs_chart() {
        if let Some(symbol) = response.symbol() {
            println!("(chart requested for {symbol})");
        }
    }
    println!();
}

fn print_symbols(state: &ConversationState) {
    if state.discussed_symbols.is_empty() {
        println!("No symbols discussed yet.\n");
        return;
    }

    let mut symbols: Vec<_> = state.discussed_symbols.iter().collect();
    symbols.sort_by(|a, b| b.1.last_discussed_at.cmp(&a.1.last_discussed_at));

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Symbol", "Last price", "Analysis", "Chart", "Last discussed"]);
    for (symbol, discussion) in symbols {
        table.add_row(vec![
            symbol.clone(),
            discussion
                .last_price
                .map_or_else(|| "-".to_string(), |p| format!("{p:.2}")),
            discussion.analysis_kind.to_string(),
            if discussion.chart_shown { "yes" } else { "no" }.to_string(),
            discussion.last_discussed_at.format("%H:%M:%S").to_string(),
        ]);
    }
    println!("{table}\n");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app = AppConfig::from_env()?.with_app_name("query-bot");
    init_tracing_with(args.log_format.unwrap_or(app.log_format));

    let session_id = args
        .session
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(session_id = %session_id, environment = %app.environment, "Starting query-bot");

    let bot = FinanceBot::builder()
        .analyzer(build_analyzer(&args)?)
        .market(build_market(&args))
        .config(QueryConfig::default().with_env_overrides()?)
        .build()?;

    println!("Finance assistant ready (session {session_id}). Type /help for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut history: Vec<HistoryTurn> = Vec::new();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                // EOF
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/exit" | "/quit" => {
                println!("Goodbye!");
                break;
            }
            "/help" => println!("{HELP}\n"),
            "/state" => match bot.store().get(&session_id) {
                Some(state) => println!("{}\n", serde_json::to_string_pretty(&state)?),
                None => println!("No state yet.\n"),
            },
            "/symbols" => match bot.store().get(&session_id) {
                Some(state) => print_symbols(&state),
                None => println!("No symbols discussed yet.\n"),
            },
            "/clear" => {
                bot.store().clear(&session_id);
                history.clear();
                println!("Session cleared.\n");
            }
            command if command.starts_with('/') => {
                println!("Unknown command: {command}. Type /help for commands.\n");
            }
            message => {
                let context = RequestContext::new(session_id.clone()).with_history(history.clone());
                let response = bot.resolve_and_respond(message, &context).await;
                print_response(&response);

                history.push(HistoryTurn::user(message));
                history.push(HistoryTurn::assistant(response.text()));
                let excess = history.len().saturating_sub(args.history);
                history.drain(..excess);
            }
        }
    }

    Ok(())
}
