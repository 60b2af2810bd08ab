//! Command-line client for the stock insights service
//!
//! ```bash
//! # One question
//! insight-cli --symbol TSLA --timeframe 6mo --message "How is Tesla doing?"
//!
//! # Interactive session
//! insight-cli --chart-out chart.png
//! ```

mod client;
mod render;

use clap::Parser;
use client::InsightClient;
use insight_stock::{InsightResponse, StockQuery, Timeframe};
use insight_utils::{LogFormat, init_tracing};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

const API_ERROR: &str = "API Error! Please try again.";

/// Timeframes offered to the user
const TIMEFRAME_CHOICES: [&str; 5] = ["1mo", "3mo", "6mo", "1y", "5y"];

#[derive(Parser, Debug)]
#[command(name = "insight-cli")]
#[command(about = "Stock insights from the terminal", long_about = None)]
struct Args {
    /// Insight server base URL
    #[arg(long, env = "INSIGHT_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Stock symbol
    #[arg(long, default_value = "AAPL")]
    symbol: String,

    /// History window for the trend chart
    #[arg(long, default_value = "1y", value_parser = TIMEFRAME_CHOICES)]
    timeframe: String,

    /// Write the decoded trend chart to this path
    #[arg(long)]
    chart_out: Option<PathBuf>,

    /// Ask a single question and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 180)]
    timeout: u64,
}

/// One line of REPL input
#[derive(Debug, PartialEq)]
enum Command {
    Ask(String),
    Symbol(String),
    Timeframe(Timeframe),
    History,
    Help,
    Exit,
    Empty,
    Invalid(String),
}

fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Ask(line.to_string());
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (command, arg) {
        ("/exit" | "/quit", _) => Command::Exit,
        ("/history", _) => Command::History,
        ("/help", _) => Command::Help,
        ("/symbol", Some(symbol)) => Command::Symbol(symbol.to_string()),
        ("/timeframe", Some(tf)) if TIMEFRAME_CHOICES.contains(&tf) => match tf.parse() {
            Ok(tf) => Command::Timeframe(tf),
            Err(e) => Command::Invalid(e),
        },
        ("/timeframe", _) => Command::Invalid(format!(
            "timeframe must be one of {}",
            TIMEFRAME_CHOICES.join(", ")
        )),
        ("/symbol", None) => Command::Invalid("usage: /symbol <SYMBOL>".to_string()),
        (other, _) => Command::Invalid(format!("unknown command {other}")),
    }
}

/// Local view of the conversation, independent of the server's history
struct Session {
    client: InsightClient,
    symbol: String,
    timeframe: Timeframe,
    chart_out: Option<PathBuf>,
    transcript: Vec<(&'static str, String)>,
}

impl Session {
    async fn ask(&mut self, question: &str) {
        let query = StockQuery::new(self.symbol.clone(), self.timeframe, question);

        match self.client.summary(&query).await {
            Ok(response) => {
                self.record(question, &response);
                println!("{}", render::render_response(&response));
                self.write_chart(&response).await;
            }
            Err(e) => {
                warn!(error = %e, "Insight request failed");
                eprintln!("{API_ERROR}");
            }
        }
    }

    fn record(&mut self, question: &str, response: &InsightResponse) {
        self.transcript.push(("You", question.to_string()));
        self.transcript
            .push(("Bot", render::summary_text(&response.ai_summary)));
    }

    async fn write_chart(&self, response: &InsightResponse) {
        let Some(path) = &self.chart_out else {
            return;
        };
        match render::save_chart(response, path).await {
            Ok(Some(path)) => println!("Chart saved to {}\n", path.display()),
            Ok(None) => println!("No trend chart available\n"),
            Err(e) => eprintln!("{e:#}"),
        }
    }

    fn print_history(&self) {
        if self.transcript.is_empty() {
            println!("(no messages yet)\n");
            return;
        }
        for (role, message) in &self.transcript {
            println!("{role}: {message}");
        }
        println!();
    }

    fn prompt(&self) -> String {
        format!("[{} {}] > ", self.symbol, self.timeframe)
    }
}

fn print_help() {
    println!("Ask a question about the current stock, or use:");
    println!("  /symbol <SYMBOL>   switch stock");
    println!("  /timeframe <T>     switch window ({})", TIMEFRAME_CHOICES.join(", "));
    println!("  /history           show this session's messages");
    println!("  /exit              quit\n");
}

async fn repl(session: &mut Session) -> anyhow::Result<()> {
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", session.prompt());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!("\nGoodbye!");
            break;
        };

        match parse_line(&line) {
            Command::Ask(question) => session.ask(&question).await,
            Command::Symbol(symbol) => session.symbol = symbol,
            Command::Timeframe(tf) => session.timeframe = tf,
            Command::History => session.print_history(),
            Command::Help => print_help(),
            Command::Exit => {
                println!("Goodbye!");
                break;
            }
            Command::Empty => {}
            Command::Invalid(reason) => eprintln!("{reason}"),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let log_format: LogFormat = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|f| f.parse().ok())
        .unwrap_or_default();
    init_tracing(log_format);

    let args = Args::parse();
    let timeframe: Timeframe = args.timeframe.parse().map_err(anyhow::Error::msg)?;

    let mut session = Session {
        client: InsightClient::new(&args.server, Duration::from_secs(args.timeout))?,
        symbol: args.symbol,
        timeframe,
        chart_out: args.chart_out,
        transcript: Vec::new(),
    };

    match args.message {
        Some(message) if message.trim().is_empty() => {}
        Some(message) => session.ask(message.trim()).await,
        None => repl(&mut session).await?,
    }

    Ok(())
}
