use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Game {
    #[serde(rename = "Loto 6/49")]
    Loto649,
    #[serde(rename = "Loto 5/40")]
    Loto540,
    Joker,
    Noroc,
    #[serde(rename = "Super Noroc")]
    SuperNoroc,
}

impl Game {
    pub fn name(self) -> &'static str {
        match self {
            Game::Loto649 => "Loto 6/49",
            Game::Loto540 => "Loto 5/40",
            Game::Joker => "Joker",
            Game::Noroc => "Noroc",
            Game::SuperNoroc => "Super Noroc",
        }
    }

    /// The digit game drawn alongside a main game, if any.
    pub fn paired(self) -> Option<Game> {
        match self {
            Game::Loto649 => Some(Game::Noroc),
            Game::Loto540 => Some(Game::SuperNoroc),
            Game::Joker | Game::Noroc | Game::SuperNoroc => None,
        }
    }

    /// Noroc and Super Noroc publish one multi-digit number, stored one digit per entry.
    pub fn is_digit_game(self) -> bool {
        matches!(self, Game::Noroc | Game::SuperNoroc)
    }

    /// Classifies the logo on a results-page column.
    pub fn from_results_logo(src: &str) -> Option<Game> {
        let lower = src.to_lowercase();
        if lower.contains("loto_6_49") || lower.contains("logo649") {
            Some(Game::Loto649)
        } else if lower.contains("loto_5_40") || lower.contains("logo540") {
            Some(Game::Loto540)
        } else if lower.contains("joker") {
            Some(Game::Joker)
        } else {
            None
        }
    }

    /// Classifies the image on a ticket card (`logo49.png`, `logo40.png`, `logo45.png`).
    pub fn from_ticket_image(src: &str) -> Option<Game> {
        if src.contains("logo49") {
            Some(Game::Loto649)
        } else if src.contains("logo40") {
            Some(Game::Loto540)
        } else if src.contains("logo45") {
            Some(Game::Joker)
        } else {
            None
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One published draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub game: Game,
    pub date: String,
    pub numbers: Vec<u32>,
    pub bonus: Vec<u32>,
}

impl Extraction {
    /// Builds the record for a main game. A six-number Joker row carries the
    /// Joker ball last.
    pub fn main_draw(game: Game, date: String, mut numbers: Vec<u32>) -> Self {
        let bonus = if game == Game::Joker && numbers.len() == 6 {
            numbers.split_off(5)
        } else {
            Vec::new()
        };
        Extraction {
            game,
            date,
            numbers,
            bonus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TicketStatus {
    #[default]
    Unknown,
    Pending,
    Won,
    Lost,
}

/// Badge labels as rendered by the ticket history page.
const STATUS_LABELS: &[(&str, TicketStatus)] = &[
    ("Câștigător", TicketStatus::Won),
    ("Necâștigător", TicketStatus::Lost),
];

impl TicketStatus {
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        STATUS_LABELS
            .iter()
            .find(|(text, _)| *text == label)
            .map(|(_, status)| *status)
            .unwrap_or(TicketStatus::Pending)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Unknown => "Unknown",
            TicketStatus::Pending => "Pending",
            TicketStatus::Won => "Won",
            TicketStatus::Lost => "Lost",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub order_id: String,
    pub ticket_id: String,
    pub game: Option<Game>,
    pub price: String,     // "24,50 RON"
    pub draw_date: String, // "15.02.2026"
    pub status: TicketStatus,
    pub played_at: String, // "Jo 12 feb 2026, Ora 18:58"
    pub detail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
}

impl Ticket {
    pub fn needs_prize(&self) -> bool {
        self.status == TicketStatus::Won && !self.detail_url.is_empty()
    }
}

/// One page of ticket history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: u32,
}
