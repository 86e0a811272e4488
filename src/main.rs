use anyhow::{Context, Result, bail};
use std::env;
use tracing_subscriber::EnvFilter;

use loto_cli::config::{self, Config};
use loto_cli::{Client, Error, Extraction, Ticket, TicketStats};

const USAGE: &str = "loto-cli - Romanian Lottery CLI

Usage:
  loto-cli <command> [--json]

Commands:
  results     Print latest extraction results
  tickets     Print ticket history
  stats       Print spending and winnings over the ticket history
  config      Print config file path
  logout      Forget the saved session

Options:
  help, -h        Show this help message
  version, -v     Show version
  --json          Print JSON instead of text

Config:
  Default: ~/.config/loto-cli/config.json (override the directory with LOTO_CONFIG_DIR)
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let command = args.iter().find(|a| *a != "--json").map(String::as_str);

    match command {
        None | Some("help" | "--help" | "-h") => print!("{USAGE}"),
        Some("version" | "--version" | "-v") => println!("loto-cli {}", env!("CARGO_PKG_VERSION")),
        Some("config") => println!("{}", config::config_path().display()),
        Some("results") => run_results(json).await?,
        Some("tickets") => run_tickets(json).await?,
        Some("stats") => run_stats(json).await?,
        Some("logout") => {
            let mut client = Client::new(Config::default())?;
            client.logout().context("failed to remove saved session")?;
            eprintln!("Session cleared.");
        }
        Some(other) => {
            eprint!("Unknown command: {other}\n\n{USAGE}");
            bail!("unknown command {other:?}");
        }
    }

    Ok(())
}

/// Creates a template on first run and loads the credentials.
fn load_config() -> Result<Config> {
    let path = config::config_path();
    if config::ensure_exists(&path).context("failed to create config")? {
        bail!(
            "config file created at {}; please edit it with your credentials and try again",
            path.display()
        );
    }
    match config::load_from(&path) {
        Err(Error::CredentialsMissing) => {
            bail!("{}\nPlease edit: {}", Error::CredentialsMissing, path.display())
        }
        other => other.with_context(|| format!("failed to load config from {}", path.display())),
    }
}

async fn run_results(json: bool) -> Result<()> {
    let path = config::config_path();
    let config = if path.exists() {
        config::read(&path).with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        Config::default()
    };

    let client = Client::new(config)?;
    let results = client.results().await.context("failed to fetch results")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }
    Ok(())
}

async fn fetch_tickets() -> Result<Vec<Ticket>> {
    let mut client = Client::new(load_config()?)?;

    eprintln!("Logging in to loto.ro...");
    client.login().await.context("login failed")?;

    client.all_tickets().await.context("failed to fetch tickets")
}

async fn run_tickets(json: bool) -> Result<()> {
    let tickets = fetch_tickets().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tickets)?);
    } else {
        print_tickets(&tickets);
    }
    Ok(())
}

async fn run_stats(json: bool) -> Result<()> {
    let tickets = fetch_tickets().await?;
    let stats = TicketStats::from(tickets.as_slice());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn print_results(results: &[Extraction]) {
    for (i, ext) in results.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("=== {} ===", ext.game);
        println!("Date: {}", ext.date);
        if ext.game.is_digit_game() {
            // one multi-digit number
            let number: String = ext.numbers.iter().map(u32::to_string).collect();
            println!("Number: {number}");
        } else {
            println!("Numbers: {}", join_numbers(&ext.numbers));
            if !ext.bonus.is_empty() {
                println!("Bonus: {}", join_numbers(&ext.bonus));
            }
        }
    }
}

fn print_tickets(tickets: &[Ticket]) {
    if tickets.is_empty() {
        println!("No tickets found.");
        return;
    }

    println!("{:<14} {:<12} {:<14} {:<10} {:<12} Prize", "Game", "Ticket ID", "Draw Date", "Status", "Price");
    println!("{}", "-".repeat(78));
    for t in tickets {
        let game = t.game.map(|g| g.name()).unwrap_or("Unknown");
        println!(
            "{:<14} {:<12} {:<14} {:<10} {:<12} {}",
            game,
            t.ticket_id,
            t.draw_date,
            t.status.to_string(),
            t.price,
            t.prize.as_deref().unwrap_or("")
        );
    }
    println!("{}", "-".repeat(78));
    println!("Total: {} ticket(s)", tickets.len());
}

fn print_stats(stats: &TicketStats) {
    if stats.total_tickets == 0 {
        println!("No ticket data available for stats.");
        return;
    }

    println!("=== Overview ===");
    println!("{:<18} {}", "Total Tickets", stats.total_tickets);
    println!("{:<18} {:.2} RON", "Total Spent", stats.total_spent);
    println!("{:<18} {:.2} RON", "Total Won", stats.total_won);
    println!("{:<18} {:+.2} RON", "Net Result", stats.net_result);
    println!("{:<18} {:.2} RON", "Avg Ticket Price", stats.average_price);
    if let Some(range) = &stats.draw_range {
        println!("{:<18} {} -> {}", "Date Range", range.first, range.last);
    }

    println!();
    println!("=== Results ===");
    println!("{:<18} {}", "Won", stats.won);
    println!("{:<18} {}", "Lost", stats.lost);
    if stats.pending > 0 {
        println!("{:<18} {}", "Pending", stats.pending);
    }
    println!("{:<18} {:.1}%", "Win Rate", stats.win_rate);

    if !stats.by_game.is_empty() {
        println!();
        println!("=== By Game ===");
        for g in &stats.by_game {
            println!(
                "{:<14} {} tickets, {:.2} RON spent, {} won ({:.2} RON)",
                g.game.name(),
                g.tickets,
                g.spent,
                g.won,
                g.won_amount
            );
        }
    }
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers.iter().map(u32::to_string).collect::<Vec<_>>().join(" ")
}
