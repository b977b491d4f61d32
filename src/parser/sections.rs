use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());

/// First heading (any level) carrying `id`.
pub fn find_heading<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    doc.select(&HEADING)
        .find(|h| h.value().attr("id") == Some(id))
}

/// Element siblings following `heading`, up to (not including) the next
/// heading of the same level.
pub fn section_siblings<'a>(heading: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let level = heading.value().name().to_string();
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(move |el| el.value().name() != level)
}

/// Raw text of every `tag` element in the section under the heading with `id`.
/// Empty when the heading is missing.
pub fn collect_section(doc: &Html, id: &str, tag: &str) -> Vec<String> {
    let Some(heading) = find_heading(doc, id) else {
        return Vec::new();
    };
    section_siblings(heading)
        .filter(|el| el.value().name() == tag)
        .map(|el| el.text().collect::<String>())
        .collect()
}
