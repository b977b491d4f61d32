use std::path::PathBuf;
use std::time::Duration;

pub const BASE_URL: &str = "https://www.felixcloutier.com/x86/";
/// Index links are site-absolute (`/x86/mov`); page paths are stored without this prefix.
pub const LINK_PREFIX: &str = "/x86/";
pub const USER_AGENT: &str = concat!("x86_scraper/", env!("CARGO_PKG_VERSION"));

pub const INDEX_TIMEOUT: Duration = Duration::from_secs(15);
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

pub const BATCH_SIZE: usize = 50;
pub const BATCH_PAUSE_SECS: u64 = 3;

/// Where the two report files land unless overridden.
pub const REPORTS_DIR: &str = ".";
pub const STORE_PATH: &str = "syntaxes/x86_instructions.json";
pub const MNEMONICS_REPORT: &str = "discovered_mnemonics.txt";
pub const MAPPINGS_REPORT: &str = "mnemonic_url_mappings.txt";

/// Resolved run settings. Built from CLI args in `main`, from `Default` in tests.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub store_path: PathBuf,
    pub reports_dir: PathBuf,
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: BASE_URL.to_string(),
            store_path: PathBuf::from(STORE_PATH),
            reports_dir: PathBuf::from(REPORTS_DIR),
            batch_size: BATCH_SIZE,
            batch_pause: Duration::from_secs(BATCH_PAUSE_SECS),
        }
    }
}

impl Settings {
    pub fn index_url(&self) -> &str {
        &self.base_url
    }

    /// Join a page path onto the base URL without doubling the separator.
    pub fn page_url(&self, page_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            page_path.trim_start_matches('/')
        )
    }
}
