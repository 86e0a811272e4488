use scraper::{ElementRef, Node, Selector};

/// Parses a static CSS selector. A typo here is a programming error, so the
/// fallback matches nothing instead of panicking mid-scrape.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| {
        tracing::error!("failed to parse selector {css:?}: {e}");
        Selector::parse("*:not(*)").expect("fallback selector '*:not(*)' always parses")
    })
}

/// Concatenated text of an element and its descendants, trimmed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Like [`element_text`], but skips every subtree rooted at one of the `skip`
/// tag names. The result is not trimmed.
pub fn text_without(element: ElementRef<'_>, skip: &[&str]) -> String {
    let mut out = String::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if !skip.contains(&el.name()) => {
                if let Some(child) = ElementRef::wrap(child) {
                    out.push_str(&text_without(child, skip));
                }
            }
            _ => {}
        }
    }
    out
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when any ancestor carries a class attribute containing `marker`.
pub fn has_ancestor_class(element: ElementRef<'_>, marker: &str) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().attr("class").is_some_and(|c| c.contains(marker)))
}

/// DD-MM-YYYY or DD.MM.YYYY.
pub fn is_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'-' || *b == b'.',
            _ => b.is_ascii_digit(),
        })
}

/// Whitespace-separated digits, e.g. "5 3 8 6 5 3 5".
pub fn is_spaced_digits(s: &str) -> bool {
    s.chars().count() >= 3
        && s.chars().any(char::is_whitespace)
        && s.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
}

/// One integer per digit character; everything else is dropped.
pub fn digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}
