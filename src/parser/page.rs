use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::sections::collect_section;
use super::text_of;
use crate::store::InstructionRecord;

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

/// How a row of the opcode table is chosen, tried in order:
///
/// | strategy                 | condition                                            |
/// |--------------------------|------------------------------------------------------|
/// | `MnemonicInInstruction`  | first data row with ≥2 cells whose cell 1 contains the mnemonic (case-insensitive) |
/// | `FirstDataRow`           | any data row exists                                   |
///
/// If neither applies, opcode and table description stay empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStrategy {
    MnemonicInInstruction,
    FirstDataRow,
}

pub const ROW_STRATEGIES: [RowStrategy; 2] =
    [RowStrategy::MnemonicInInstruction, RowStrategy::FirstDataRow];

/// Cell indices holding the description, first existing wins. Opcode tables
/// differ in column count (Op/En, 64-bit mode, CPUID flag, ...).
pub const DESCRIPTION_COLUMNS: [usize; 3] = [6, 5, 4];

/// Fields pulled from the first table on the page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OpcodeRow {
    pub opcode: String,
    pub description: String,
}

/// Everything extracted from one instruction page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageFields {
    pub title: String,
    pub table: OpcodeRow,
    pub operation: String,
    pub description_section: String,
}

impl PageFields {
    /// The record takes the section description as-is, even when empty.
    /// `table.description` is parsed but not stored.
    pub fn into_record(self, mnemonic: &str, url: &str) -> InstructionRecord {
        if self.description_section.is_empty() && !self.table.description.is_empty() {
            debug!("{}: no description section, table description dropped", mnemonic);
        }
        InstructionRecord {
            instruction: mnemonic.to_uppercase(),
            description: self.description_section,
            title: self.title,
            opcode: self.table.opcode,
            operation: self.operation,
            url: url.to_string(),
        }
    }
}

pub fn parse_page(html: &str, mnemonic: &str) -> PageFields {
    let doc = Html::parse_document(html);
    PageFields {
        title: doc.select(&H1).next().map(text_of).unwrap_or_default(),
        table: opcode_row(&doc, mnemonic),
        operation: collect_section(&doc, "operation", "pre").join("\n\n"),
        description_section: collect_section(&doc, "description", "p")
            .iter()
            .map(|p| p.trim())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Parse a page straight into a record for `mnemonic` served from `url`.
pub fn extract_record(html: &str, mnemonic: &str, url: &str) -> InstructionRecord {
    parse_page(html, mnemonic).into_record(mnemonic, url)
}

fn opcode_row(doc: &Html, mnemonic: &str) -> OpcodeRow {
    let Some(table) = doc.select(&TABLE).next() else {
        return OpcodeRow::default();
    };

    let data_rows: Vec<Vec<ElementRef>> = table
        .select(&ROW)
        .skip(1)
        .map(|row| row.select(&CELL).collect())
        .collect();

    ROW_STRATEGIES
        .iter()
        .find_map(|strategy| select_row(*strategy, &data_rows, mnemonic))
        .map(read_row)
        .unwrap_or_default()
}

fn select_row<'r, 'a>(
    strategy: RowStrategy,
    rows: &'r [Vec<ElementRef<'a>>],
    mnemonic: &str,
) -> Option<&'r [ElementRef<'a>]> {
    match strategy {
        RowStrategy::MnemonicInInstruction => {
            let needle = mnemonic.to_uppercase();
            rows.iter()
                .find(|cells| {
                    cells.len() > 1 && text_of(cells[1]).to_uppercase().contains(&needle)
                })
                .map(Vec::as_slice)
        }
        RowStrategy::FirstDataRow => rows.first().map(Vec::as_slice),
    }
}

fn read_row(cells: &[ElementRef]) -> OpcodeRow {
    let opcode = cells.first().copied().map(text_of).unwrap_or_default();
    let description = DESCRIPTION_COLUMNS
        .iter()
        .find_map(|&i| cells.get(i).copied())
        .map(text_of)
        .unwrap_or_default();
    OpcodeRow {
        opcode,
        description,
    }
}
