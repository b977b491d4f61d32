use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{Settings, INDEX_TIMEOUT, MAPPINGS_REPORT, MNEMONICS_REPORT};
use crate::net::{Fetch, FetchError};
use crate::parser::index::parse_index;

/// Used when the index page cannot be fetched.
pub const FALLBACK_MNEMONICS: &[&str] = &[
    "MOV", "LEA", "PUSH", "POP", "XCHG", "MOVSX", "MOVZX", "CVTSI2SD", "CVTSD2SI",
    "ADD", "SUB", "MUL", "DIV", "INC", "DEC", "AND", "OR", "XOR", "NOT", "SHL", "SHR",
    "JMP", "CALL", "RET", "LOOP", "JNZ", "JZ", "JE", "JNE", "JL", "JLE", "JG", "JGE",
    "CMP", "TEST", "NEG", "CLD", "STD", "NOP", "HLT", "INT", "IRET", "LEAVE",
    "FADD", "FSUB", "FMUL", "FDIV", "FLD", "FST", "FSTP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Index,
    Fallback,
}

/// Sorted mnemonic set plus mnemonic → page path. Immutable once built.
#[derive(Debug, Clone)]
pub struct Catalog {
    mnemonics: Vec<String>,
    paths: BTreeMap<String, String>,
    source: CatalogSource,
}

impl Catalog {
    /// Later entries overwrite earlier page paths for the same mnemonic.
    pub fn from_entries<I>(entries: I, source: CatalogSource) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let paths: BTreeMap<String, String> = entries.into_iter().collect();
        let mnemonics = paths.keys().cloned().collect();
        Catalog {
            mnemonics,
            paths,
            source,
        }
    }

    pub fn fallback() -> Self {
        Catalog::from_entries(
            FALLBACK_MNEMONICS
                .iter()
                .map(|m| (m.to_string(), m.to_lowercase())),
            CatalogSource::Fallback,
        )
    }

    pub fn mnemonics(&self) -> &[String] {
        &self.mnemonics
    }

    pub fn paths(&self) -> &BTreeMap<String, String> {
        &self.paths
    }

    pub fn page_path(&self, mnemonic: &str) -> Option<&str> {
        self.paths.get(mnemonic).map(String::as_str)
    }

    /// Page path for `mnemonic`, defaulting to its lowercase form.
    pub fn resolve_path(&self, mnemonic: &str) -> String {
        self.page_path(mnemonic)
            .map(str::to_string)
            .unwrap_or_else(|| mnemonic.to_lowercase())
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.mnemonics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mnemonics.is_empty()
    }

    /// One mnemonic per line.
    pub fn render_mnemonics(&self) -> String {
        let mut out = String::new();
        for m in &self.mnemonics {
            out.push_str(m);
            out.push('\n');
        }
        out
    }

    /// `MNEMONIC -> page_path`, one per line.
    pub fn render_mappings(&self) -> String {
        let mut out = String::new();
        for (m, path) in self.paths() {
            let _ = writeln!(out, "{} -> {}", m, path);
        }
        out
    }
}

/// Fetch and parse the index page.
pub async fn fetch_index<F: Fetch>(fetcher: &F, settings: &Settings) -> Result<Catalog, FetchError> {
    let url = settings.index_url();
    info!("Fetching mnemonic index: {}", url);
    let html = fetcher.get(url, INDEX_TIMEOUT).await?;
    Ok(parse_index(&html))
}

/// Build the run's catalog. Never fails: a fetch error yields the fallback list.
pub async fn build<F: Fetch>(fetcher: &F, settings: &Settings) -> Catalog {
    match fetch_index(fetcher, settings).await {
        Ok(catalog) => {
            info!("Extracted {} unique mnemonics from index", catalog.len());
            catalog
        }
        Err(e) => {
            warn!("Index fetch failed, using fallback list: {}", e);
            Catalog::fallback()
        }
    }
}

/// Regenerate both report files under `dir`. Returns the paths written.
pub fn write_reports(catalog: &Catalog, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let list_path = dir.join(MNEMONICS_REPORT);
    std::fs::write(&list_path, catalog.render_mnemonics())
        .with_context(|| format!("writing {}", list_path.display()))?;

    let map_path = dir.join(MAPPINGS_REPORT);
    std::fs::write(&map_path, catalog.render_mappings())
        .with_context(|| format!("writing {}", map_path.display()))?;

    Ok((list_path, map_path))
}
