//! Ticket history from bilete.loto.ro.
//!
//! History pages list six ticket cards each, newest first, with a caption
//! like "Showing 1 to 6 of 81 results". Card fields are identified by their
//! Romanian labels. A card that lacks a field keeps that field's zero value;
//! the template is not ours and changes without notice.

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::session::{BILETE_URL, PageRequest, Transport};
use crate::types::{Game, Ticket, TicketPage, TicketStatus};
use crate::utils::{collapse_ws, element_text, selector, text_without};

pub const TICKETS_PER_PAGE: u32 = 6;
const TICKET_HISTORY_PATH: &str = "/history/ticket";

static TOTAL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"of\s+(\d+)\s+results").ok());

#[derive(Debug, Clone, Copy)]
enum Field {
    OrderId,
    TicketId,
    DrawDate,
    Status,
}

/// Row label → field. The first label contained in a row wins.
const FIELD_LABELS: &[(&str, Field)] = &[
    ("ID Comandă", Field::OrderId),
    ("ID Bilet", Field::TicketId),
    ("Tragerea", Field::DrawDate),
    ("Stare Bilet", Field::Status),
];

pub fn ticket_page_url(page: u32) -> String {
    format!("{BILETE_URL}{TICKET_HISTORY_PATH}?page_no={page}")
}

pub fn page_count(total: u32) -> u32 {
    total.div_ceil(TICKETS_PER_PAGE)
}

pub async fn fetch_ticket_page<T: Transport>(transport: &T, page: u32) -> Result<TicketPage> {
    let url = ticket_page_url(page);
    let response = transport.send(PageRequest::get(&url)).await?;
    if !response.is_ok() {
        return Err(Error::unexpected_status(url, response.status));
    }
    let parsed = parse_ticket_page(&response.body);
    tracing::debug!(page, tickets = parsed.tickets.len(), total = parsed.total, "parsed ticket page");
    Ok(parsed)
}

/// Every page of history in origin order, winning tickets enriched with
/// their prize. Pages are fetched one at a time.
pub async fn fetch_all_tickets<T: Transport>(transport: &T) -> Result<Vec<Ticket>> {
    let first = fetch_ticket_page(transport, 1).await?;
    let total = first.total;
    let mut tickets = first.tickets;

    // The caption total only bounds the page loop.
    if total > 0 && !tickets.is_empty() {
        for page in 2..=page_count(total) {
            let next = fetch_ticket_page(transport, page)
                .await
                .map_err(|e| Error::Page {
                    page,
                    source: Box::new(e),
                })?;
            // The total can drift while paging; an empty page means we're done.
            if next.tickets.is_empty() {
                tracing::debug!(page, "empty ticket page, stopping");
                break;
            }
            tickets.extend(next.tickets);
        }
    }

    enrich_prizes(transport, &mut tickets).await;
    Ok(tickets)
}

/// Fills `prize` on winning tickets. A failed lookup is logged and leaves
/// the prize empty.
pub async fn enrich_prizes<T: Transport>(transport: &T, tickets: &mut [Ticket]) {
    for ticket in tickets.iter_mut().filter(|t| t.needs_prize()) {
        match fetch_prize(transport, &ticket.detail_url).await {
            Ok(Some(prize)) => ticket.prize = Some(prize),
            Ok(None) => {
                tracing::debug!(ticket = %ticket.ticket_id, "no prize total on detail page");
            }
            Err(e) => {
                tracing::warn!(ticket = %ticket.ticket_id, error = %e, "failed to fetch prize");
            }
        }
    }
}

pub async fn fetch_prize<T: Transport>(transport: &T, detail_url: &str) -> Result<Option<String>> {
    let url = resolve_detail_url(detail_url)?;
    let page = transport.send(PageRequest::get(url.as_str())).await?;
    if !page.is_ok() {
        return Err(Error::unexpected_status(url, page.status));
    }
    Ok(parse_prize(&page.body))
}

/// Detail links are sometimes site-relative.
pub fn resolve_detail_url(detail_url: &str) -> Result<Url> {
    Url::parse(BILETE_URL)
        .and_then(|base| base.join(detail_url))
        .map_err(|e| Error::InvalidUrl {
            url: detail_url.to_string(),
            reason: e.to_string(),
        })
}

pub fn parse_ticket_page(html: &str) -> TicketPage {
    let doc = Html::parse_document(html);
    let tickets = doc
        .select(&selector("div.ticket-preview"))
        .map(parse_ticket_card)
        .collect();
    TicketPage {
        tickets,
        total: parse_total(&doc),
    }
}

/// Reads N from "... of N results"; 0 when the caption is missing.
fn parse_total(doc: &Html) -> u32 {
    let Some(re) = TOTAL_RE.as_ref() else {
        return 0;
    };
    let mut total = 0;
    for caption in doc.select(&selector("p.small.text-muted")) {
        let text = caption.text().collect::<String>();
        if !text.contains("results") {
            continue;
        }
        if let Some(n) = re.captures(&text).and_then(|c| c[1].parse().ok()) {
            total = n;
        }
    }
    total
}

fn parse_ticket_card(card: ElementRef<'_>) -> Ticket {
    let mut ticket = Ticket::default();
    let item_sel = selector("li.list-group-item");

    // First row: game logo and price
    if let Some(first) = card.select(&item_sel).next() {
        ticket.game = first
            .select(&selector("img"))
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(Game::from_ticket_image);
        ticket.price = first
            .select(&selector("span.price"))
            .next()
            .map(parse_price)
            .unwrap_or_default();
    }

    for item in card.select(&item_sel) {
        let text = element_text(item);
        let Some(field) = FIELD_LABELS
            .iter()
            .find(|(label, _)| text.contains(label))
            .map(|(_, field)| *field)
        else {
            continue;
        };

        match field {
            Field::OrderId => ticket.order_id = spans_text(item, "span"),
            Field::TicketId => ticket.ticket_id = spans_text(item, "span"),
            Field::DrawDate => ticket.draw_date = spans_text(item, "span"),
            Field::Status => ticket.status = TicketStatus::from_label(&spans_text(item, "span.badge")),
        }
    }

    if let Some(href) = card
        .select(&selector("a[href*='ticket/details']"))
        .next()
        .and_then(|a| a.value().attr("href"))
    {
        ticket.detail_url = href.to_string();
    }

    let played = card
        .select(&selector(".card-footer small"))
        .flat_map(|small| small.text())
        .collect::<String>();
    let played = played.trim();
    ticket.played_at = played.strip_prefix("Jucat ").unwrap_or(played).trim().to_string();

    ticket
}

fn spans_text(item: ElementRef<'_>, css: &str) -> String {
    item.select(&selector(css))
        .flat_map(|span| span.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// `24<sup>,50</sup> <em>ron</em>` → "24,50 RON".
fn parse_price(price: ElementRef<'_>) -> String {
    let integer = text_without(price, &["sup", "em"]);
    let integer = integer.trim();
    if integer.is_empty() {
        return String::new();
    }
    let decimals = price
        .select(&selector("sup"))
        .flat_map(|sup| sup.text())
        .collect::<String>();
    format!("{integer}{} RON", decimals.trim())
}

/// Amount from the `tfoot` row labelled TOTAL on a ticket detail page.
pub fn parse_prize(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let cell_sel = selector("td, th");
    let prize = doc
        .select(&selector("tfoot tr"))
        .filter(|row| element_text(*row).contains("TOTAL"))
        .find_map(|row| {
            row.select(&cell_sel)
                .map(element_text)
                .find(|text| text.contains("RON"))
        });
    prize.map(|text| collapse_ws(&text))
}
