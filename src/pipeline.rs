use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::catalog::{self, Catalog, CatalogSource};
use crate::config::{Settings, PAGE_TIMEOUT};
use crate::net::{Fetch, FetchError};
use crate::parser::page::extract_record;
use crate::store::{self, InstructionRecord, Store};

/// Cooperative stop flag, checked at batch boundaries and before each fetch.
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts returned after a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub catalog_size: usize,
    pub remaining: usize,
    pub ok: usize,
    pub failed: usize,
    pub batches: usize,
    pub persists: usize,
    pub stored: usize,
    pub cancelled: bool,
}

impl RunSummary {
    /// Percentage of attempted mnemonics that produced a record.
    pub fn success_rate(&self) -> Option<f64> {
        let attempted = self.ok + self.failed;
        (attempted > 0).then(|| self.ok as f64 * 100.0 / attempted as f64)
    }
}

/// Fetch one instruction page and extract its record.
pub async fn extract<F: Fetch>(
    fetcher: &F,
    settings: &Settings,
    mnemonic: &str,
    page_path: &str,
) -> Result<InstructionRecord, FetchError> {
    let url = settings.page_url(page_path);
    let html = fetcher.get(&url, PAGE_TIMEOUT).await?;
    Ok(extract_record(&html, mnemonic, &url))
}

/// Catalog mnemonics not yet in the store, in catalog order.
pub fn remaining(catalog: &Catalog, store: &Store) -> Vec<String> {
    catalog
        .mnemonics()
        .iter()
        .filter(|m| !store.contains(m))
        .cloned()
        .collect()
}

pub struct Pipeline<'a, F> {
    fetcher: &'a F,
    settings: &'a Settings,
    cancel: Cancel,
}

impl<'a, F: Fetch> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, settings: &'a Settings, cancel: Cancel) -> Self {
        Pipeline {
            fetcher,
            settings,
            cancel,
        }
    }

    /// Load store, build catalog, scrape what is missing in batches,
    /// persisting after each batch.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut store = store::load(&self.settings.store_path);
        let catalog = catalog::build(self.fetcher, self.settings).await;

        let mut summary = RunSummary {
            catalog_size: catalog.len(),
            stored: store.len(),
            ..Default::default()
        };

        if catalog.source() == CatalogSource::Fallback {
            println!("Index unavailable, using {} built-in mnemonics.", catalog.len());
        }
        if catalog.is_empty() {
            println!("No mnemonics found, nothing to do.");
            return Ok(summary);
        }

        let (list, map) = catalog::write_reports(&catalog, &self.settings.reports_dir)?;
        info!("Wrote {} and {}", list.display(), map.display());

        let todo = remaining(&catalog, &store);
        summary.remaining = todo.len();
        if todo.is_empty() {
            println!("All {} mnemonics already processed.", catalog.len());
            return Ok(summary);
        }
        println!("Scraping {} of {} mnemonics...", todo.len(), catalog.len());

        let pb = ProgressBar::new(todo.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );

        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<&[String]> = todo.chunks(batch_size).collect();
        let last = batches.len() - 1;

        for (i, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            info!("Batch {}/{} ({} instructions)", i + 1, batches.len(), batch.len());
            summary.batches += 1;

            for mnemonic in batch.iter() {
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }
                pb.set_message(mnemonic.clone());

                let page_path = catalog.resolve_path(mnemonic);
                match extract(self.fetcher, self.settings, mnemonic, &page_path).await {
                    Ok(record) => {
                        store.merge(record);
                        summary.ok += 1;
                    }
                    Err(e) => {
                        warn!("Failed to scrape {}: {}", mnemonic, e);
                        summary.failed += 1;
                    }
                }
                pb.inc(1);
            }

            store::persist(&store, &self.settings.store_path)
                .with_context(|| format!("saving batch {}", i + 1))?;
            summary.persists += 1;

            if i < last && !self.cancel.is_cancelled() && !self.settings.batch_pause.is_zero() {
                info!("Pausing {:.1}s before next batch", self.settings.batch_pause.as_secs_f64());
                tokio::time::sleep(self.settings.batch_pause).await;
            }
        }

        pb.finish_and_clear();
        summary.stored = store.len();
        if summary.cancelled {
            warn!("Cancelled; progress saved to {}", self.settings.store_path.display());
        }
        info!(
            "Scraped {} mnemonics ({} ok, {} failed)",
            summary.ok + summary.failed,
            summary.ok,
            summary.failed
        );

        print_summary(&summary, &store, self.settings);
        Ok(summary)
    }
}

fn print_summary(summary: &RunSummary, store: &Store, settings: &Settings) {
    println!(
        "Catalog: {} mnemonics, {} to scrape, {} batches ({} saves)",
        summary.catalog_size, summary.remaining, summary.batches, summary.persists
    );
    println!("Successfully scraped: {}", summary.ok);
    println!("Failed to scrape:     {}", summary.failed);
    println!("Total in store:       {}", summary.stored);
    if let Some(rate) = summary.success_rate() {
        println!("Success rate:         {:.1}%", rate);
    }
    if let Ok(meta) = std::fs::metadata(&settings.store_path) {
        println!("Store file size:      {:.1} MB", meta.len() as f64 / (1024.0 * 1024.0));
    }
    if let Some((_, sample)) = store.iter().next() {
        println!("\nSample entry:");
        println!("  Instruction: {}", sample.instruction);
        println!("  Title:       {}", sample.title);
        println!("  Opcode:      {}", sample.opcode);
        let preview: String = sample.description.chars().take(100).collect();
        println!("  Description: {}...", preview);
    }
}
