pub mod index;
pub mod normalize;
pub mod page;
pub mod sections;

use scraper::ElementRef;

/// Concatenated descendant text, trimmed.
pub(crate) fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}
