//! Latest draws from the loto.ro homepage.
//!
//! The results row holds three columns, one per main game:
//!
//! ```text
//! Loto 6/49 + Noroc         logo Loto_6_49__noroc.png
//! Loto 5/40 + Super Noroc   logo Loto_5_40__super_noroc.png
//! Joker                     logo joker__noroc_plus.png
//! ```
//!
//! Inside a column every value sits in its own Ninja Table: a multi-cell
//! table with the draw, a one-cell table with the date, a one-cell table with
//! the spaced Noroc digits. The page also renders the previous draw under an
//! `ascuns` (hidden) wrapper, which is skipped.

use scraper::{ElementRef, Html};

use crate::error::{Error, Result};
use crate::session::{LOTO_URL, PageRequest, Transport};
use crate::types::{Extraction, Game};
use crate::utils::{digits, element_text, has_ancestor_class, is_date, is_spaced_digits, selector};

const RESULTS_SECTION_CLASS: &str = "vc_custom_1643109784313";
const HIDDEN_CLASS: &str = "ascuns";

pub async fn fetch_results<T: Transport>(transport: &T) -> Result<Vec<Extraction>> {
    let page = transport.send(PageRequest::get(LOTO_URL)).await?;
    if !page.is_ok() {
        return Err(Error::unexpected_status(page.url, page.status));
    }
    let extractions = parse_results(&page.body)?;
    tracing::debug!(count = extractions.len(), "parsed results page");
    Ok(extractions)
}

pub fn parse_results(html: &str) -> Result<Vec<Extraction>> {
    let doc = Html::parse_document(html);
    let section_sel = selector(&format!("div[class*='{RESULTS_SECTION_CLASS}']"));
    let section = doc.select(&section_sel).next().ok_or(Error::SectionNotFound)?;

    let mut extractions = Vec::new();
    for column in section.select(&selector("div.vc_col-sm-4")) {
        extractions.extend(parse_column(column));
    }
    Ok(extractions)
}

#[derive(Default)]
struct ColumnValues {
    numbers: Option<Vec<u32>>,
    date: Option<String>,
    noroc: Option<String>,
}

fn parse_column(column: ElementRef<'_>) -> Vec<Extraction> {
    let Some(game) = column_game(column) else {
        tracing::debug!("skipping results column without a known logo");
        return Vec::new();
    };

    let mut values = ColumnValues::default();
    for table in column.select(&selector("table")) {
        if has_ancestor_class(table, HIDDEN_CLASS) {
            continue;
        }

        let cells = table_cells(table);
        match cells.as_slice() {
            [] => {}
            [single] => {
                if is_date(single) {
                    values.date.get_or_insert_with(|| single.clone());
                } else if is_spaced_digits(single) {
                    values.noroc.get_or_insert_with(|| single.clone());
                }
            }
            _ => {
                if values.numbers.is_none() {
                    values.numbers = Some(cells.iter().filter_map(|c| c.parse().ok()).collect());
                }
            }
        }
    }

    let date = values.date.unwrap_or_default();
    let mut out = Vec::new();

    let numbers = values.numbers.unwrap_or_default();
    if !numbers.is_empty() {
        out.push(Extraction::main_draw(game, date.clone(), numbers));
    }

    if let (Some(noroc), Some(paired)) = (values.noroc, game.paired()) {
        out.push(Extraction {
            game: paired,
            date,
            numbers: digits(&noroc),
            bonus: Vec::new(),
        });
    }
    out
}

/// First logo in the column that names a game. Lazy-loaded images keep the
/// real URL in `data-src`.
fn column_game(column: ElementRef<'_>) -> Option<Game> {
    column.select(&selector("img")).find_map(|img| {
        let attrs = img.value();
        let src = attrs
            .attr("data-src")
            .filter(|s| !s.is_empty())
            .or_else(|| attrs.attr("src"))
            .unwrap_or("");
        Game::from_results_logo(src)
    })
}

fn table_cells(table: ElementRef<'_>) -> Vec<String> {
    table.select(&selector("tbody td")).map(element_text).collect()
}
