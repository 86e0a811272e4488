//! Spending and winnings summary over a ticket history.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::{Game, Ticket, TicketStatus};

/// Order of the per-game breakdown.
const GAMES: [Game; 5] = [Game::Loto649, Game::Loto540, Game::Joker, Game::Noroc, Game::SuperNoroc];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStats {
    pub total_tickets: usize,
    pub total_spent: f64,
    pub total_won: f64,
    pub net_result: f64,
    pub average_price: f64,
    pub won: usize,
    pub lost: usize,
    pub pending: usize,
    /// Percent of decided (won or lost) tickets that won.
    pub win_rate: f64,
    pub draw_range: Option<DrawRange>,
    pub by_game: Vec<GameStats>,
}

/// Oldest and newest draw date, taken from the ends of the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawRange {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStats {
    pub game: Game,
    pub tickets: usize,
    pub spent: f64,
    pub won: usize,
    pub won_amount: f64,
}

impl GameStats {
    fn new(game: Game) -> Self {
        GameStats {
            game,
            tickets: 0,
            spent: 0.0,
            won: 0,
            won_amount: 0.0,
        }
    }
}

/// Expects tickets newest first, the order the history pages use.
impl From<&[Ticket]> for TicketStats {
    fn from(tickets: &[Ticket]) -> Self {
        let mut stats = TicketStats {
            total_tickets: tickets.len(),
            ..TicketStats::default()
        };
        let mut games: HashMap<Game, GameStats> = HashMap::new();

        for ticket in tickets {
            let price = parse_amount(&ticket.price);
            let won = ticket.status == TicketStatus::Won;
            let prize = match &ticket.prize {
                Some(prize) if won => parse_amount(prize),
                _ => 0.0,
            };

            stats.total_spent += price;
            stats.total_won += prize;
            match ticket.status {
                TicketStatus::Won => stats.won += 1,
                TicketStatus::Lost => stats.lost += 1,
                TicketStatus::Pending => stats.pending += 1,
                TicketStatus::Unknown => {}
            }

            // Tickets of unknown game count in the totals only
            if let Some(game) = ticket.game {
                let entry = games.entry(game).or_insert_with(|| GameStats::new(game));
                entry.tickets += 1;
                entry.spent += price;
                if won {
                    entry.won += 1;
                    entry.won_amount += prize;
                }
            }
        }

        if let (Some(newest), Some(oldest)) = (tickets.first(), tickets.last()) {
            stats.draw_range = Some(DrawRange {
                first: oldest.draw_date.clone(),
                last: newest.draw_date.clone(),
            });
            stats.average_price = stats.total_spent / tickets.len() as f64;
        }

        let decided = stats.won + stats.lost;
        if decided > 0 {
            stats.win_rate = stats.won as f64 / decided as f64 * 100.0;
        }
        stats.net_result = stats.total_won - stats.total_spent;
        stats.by_game = GAMES.iter().filter_map(|g| games.remove(g)).collect();
        stats
    }
}

/// Reads a site amount such as "24,50 RON" or "1.250,00 RON". Dots are
/// thousands separators and the comma is the decimal mark. Anything
/// unreadable counts as zero.
pub fn parse_amount(text: &str) -> f64 {
    let number = text.trim();
    let number = number
        .strip_suffix("RON")
        .or_else(|| number.strip_suffix("ron"))
        .unwrap_or(number);
    let number: String = number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    number.parse().unwrap_or(0.0)
}
