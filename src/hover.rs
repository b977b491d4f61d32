use std::fmt::Write as _;

use crate::store::{InstructionRecord, Store};

/// Markdown for an editor hover over `record`.
pub fn render(record: &InstructionRecord) -> String {
    let title = if record.title.is_empty() {
        "Unknown Instruction"
    } else {
        record.title.as_str()
    };
    let mut out = format!("**{}**\n\n", title);

    if !record.opcode.is_empty() {
        let _ = write!(out, "**Opcode:** {}\n\n", record.opcode);
    }
    if !record.description.is_empty() {
        // single newlines become paragraph breaks in markdown
        let paragraphs = record.description.replace('\n', "\n\n");
        let _ = write!(out, "**Description:** {}\n\n", paragraphs);
    }
    if !record.url.is_empty() {
        let _ = write!(out, "[View Documentation]({})", record.url);
    }
    out
}

/// Case-insensitive lookup rendered as hover markdown.
pub fn lookup(store: &Store, word: &str) -> Option<String> {
    store.get(word).map(render)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub records: usize,
    pub missing_title: usize,
    pub missing_opcode: usize,
    pub missing_description: usize,
    pub missing_operation: usize,
}

pub fn stats(store: &Store) -> StoreStats {
    let mut s = StoreStats {
        records: store.len(),
        ..Default::default()
    };
    for (_, r) in store.iter() {
        s.missing_title += r.title.is_empty() as usize;
        s.missing_opcode += r.opcode.is_empty() as usize;
        s.missing_description += r.description.is_empty() as usize;
        s.missing_operation += r.operation.is_empty() as usize;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add() -> InstructionRecord {
        InstructionRecord {
            instruction: "ADD".into(),
            title: "ADD — Add".into(),
            opcode: "04 ib".into(),
            description: "Adds operands.\nSets flags.".into(),
            operation: "DEST := DEST + SRC;".into(),
            url: "https://www.felixcloutier.com/x86/add".into(),
        }
    }

    #[test]
    fn full_record() {
        assert_eq!(
            render(&add()),
            "**ADD — Add**\n\n**Opcode:** 04 ib\n\n**Description:** Adds operands.\n\nSets flags.\n\n\
             [View Documentation](https://www.felixcloutier.com/x86/add)"
        );
    }

    #[test]
    fn sparse_record() {
        let r = InstructionRecord {
            instruction: "NOP".into(),
            url: "u".into(),
            ..Default::default()
        };
        assert_eq!(render(&r), "**Unknown Instruction**\n\n[View Documentation](u)");
    }

    #[test]
    fn lookup_ignores_case() {
        let mut store = Store::new();
        store.merge(add());
        assert!(lookup(&store, "add").is_some());
        assert!(lookup(&store, "Add").is_some());
        assert!(lookup(&store, "sub").is_none());
    }

    #[test]
    fn counts_missing_fields() {
        let mut store = Store::new();
        store.merge(add());
        store.merge(InstructionRecord {
            instruction: "NOP".into(),
            url: "u".into(),
            ..Default::default()
        });
        assert_eq!(
            stats(&store),
            StoreStats {
                records: 2,
                missing_title: 1,
                missing_opcode: 1,
                missing_description: 1,
                missing_operation: 1,
            }
        );
    }
}
