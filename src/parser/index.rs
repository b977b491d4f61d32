use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::normalize::normalize;
use super::text_of;
use crate::catalog::{Catalog, CatalogSource};
use crate::config::LINK_PREFIX;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Parse every table on the index page into a catalog.
///
/// The first row of each table is a header. For each data row the first cell
/// names the instruction: its link text and href when linked, else its plain
/// text with the lowercased text as page path. Later rows overwrite earlier
/// page paths for the same mnemonic.
pub fn parse_index(html: &str) -> Catalog {
    let doc = Html::parse_document(html);
    let mut entries = Vec::new();

    let tables: Vec<ElementRef> = doc.select(&TABLE).collect();
    debug!("index has {} tables", tables.len());

    for table in tables {
        for row in table.select(&ROW).skip(1) {
            let Some(cell) = row.select(&CELL).next() else {
                continue;
            };
            let Some((text, page_path)) = first_cell_target(cell) else {
                continue;
            };
            for mnemonic in normalize(&text) {
                entries.push((mnemonic, page_path.clone()));
            }
        }
    }

    Catalog::from_entries(entries, CatalogSource::Index)
}

/// Candidate text and page path for a row's first cell.
fn first_cell_target(cell: ElementRef) -> Option<(String, String)> {
    let (text, page_path) = match cell.select(&LINK).next() {
        Some(link) => {
            let href = link.value().attr("href").unwrap_or_default();
            let path = href.strip_prefix(LINK_PREFIX).unwrap_or(href);
            (text_of(link), path.to_string())
        }
        None => {
            let text = text_of(cell);
            let path = text.to_lowercase();
            (text, path)
        }
    };

    if text.is_empty() {
        None
    } else {
        Some((text, page_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&str]) -> String {
        format!("<html><body><table>{}</table></body></html>", rows.join(""))
    }

    #[test]
    fn plain_text_row_defaults_to_lowercase_path() {
        let html = table(&[
            "<tr><th>Mnemonic</th><th>Description</th></tr>",
            "<tr><td>MOV</td><td>Move</td></tr>",
        ]);
        let cat = parse_index(&html);
        assert_eq!(cat.mnemonics(), ["MOV"]);
        assert_eq!(cat.page_path("MOV"), Some("mov"));
    }

    #[test]
    fn linked_row_strips_prefix() {
        let html = table(&[
            "<tr><th>Mnemonic</th><th>Summary</th></tr>",
            r#"<tr><td><a href="/x86/vmlaunch:vmresume">VMLAUNCH/VMRESUME</a></td><td>Launch/Resume VM</td></tr>"#,
            r#"<tr><td><a href="/x86/getsec[capabilities]">GETSEC[CAPABILITIES]</a></td><td>Report SMX capabilities</td></tr>"#,
        ]);
        let cat = parse_index(&html);
        assert_eq!(cat.mnemonics(), ["CAPABILITIES", "VMLAUNCH", "VMRESUME"]);
        assert_eq!(cat.page_path("VMLAUNCH"), Some("vmlaunch:vmresume"));
        assert_eq!(cat.page_path("VMRESUME"), Some("vmlaunch:vmresume"));
        assert_eq!(cat.page_path("CAPABILITIES"), Some("getsec[capabilities]"));
    }

    #[test]
    fn foreign_href_kept_verbatim() {
        let html = table(&[
            "<tr><th>x</th></tr>",
            r#"<tr><td><a href="https://example.com/nop">NOP</a></td></tr>"#,
        ]);
        let cat = parse_index(&html);
        assert_eq!(cat.page_path("NOP"), Some("https://example.com/nop"));
    }

    #[test]
    fn header_row_skipped_per_table() {
        let html = "<table><tr><td>ADD</td></tr><tr><td>SUB</td></tr></table>\
                    <table><tr><td>XOR</td></tr><tr><td>AND</td></tr></table>";
        let cat = parse_index(html);
        assert_eq!(cat.mnemonics(), ["AND", "SUB"]);
    }

    #[test]
    fn last_row_wins_for_duplicates() {
        let html = table(&[
            "<tr><th>h</th></tr>",
            r#"<tr><td><a href="/x86/cmps:cmpsb">CMPS</a></td></tr>"#,
            r#"<tr><td><a href="/x86/cmps-second">CMPS</a></td></tr>"#,
        ]);
        let cat = parse_index(&html);
        assert_eq!(cat.mnemonics(), ["CMPS"]);
        assert_eq!(cat.page_path("CMPS"), Some("cmps-second"));
    }

    #[test]
    fn empty_and_invalid_cells_ignored() {
        let html = table(&[
            "<tr><th>h</th></tr>",
            "<tr><td>   </td></tr>",
            "<tr></tr>",
            "<tr><td>V-BAD</td></tr>",
            "<tr><td>lea  load effective address</td></tr>",
        ]);
        let cat = parse_index(&html);
        assert_eq!(cat.mnemonics(), ["LEA"]);
        assert_eq!(cat.page_path("LEA"), Some("lea  load effective address"));
    }

    #[test]
    fn no_tables_is_empty() {
        let cat = parse_index("<html><body><p>maintenance</p></body></html>");
        assert!(cat.is_empty());
    }

    #[test]
    fn fixture_index_is_deterministic() {
        let html = std::fs::read_to_string("tests/fixtures/index.html").unwrap();
        let a = parse_index(&html);
        let b = parse_index(&html);
        assert_eq!(a.mnemonics(), b.mnemonics());
        assert_eq!(a.paths(), b.paths());
        assert!(a.mnemonics().contains(&"MOV".to_string()));
        assert_eq!(a.page_path("CMPSB"), Some("cmps:cmpsb:cmpsw:cmpsd:cmpsq"));
    }
}
