//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Page size used when pulling remote catalog changes.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Configuration for opening an [`Engine`](crate::engine::Engine).
///
/// All collaborators receive their dependencies through this struct; there
/// is no global state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Location of the local store file.
    pub store_path: PathBuf,
    /// Base URL of the remote catalog service.
    pub remote_base_url: String,
    /// Remote page size. The reference deployment uses 500.
    pub page_size: usize,
    /// Per-request HTTP timeout for catalog pulls.
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let store_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quiz-device")
            .join("app.db");

        Self {
            store_path,
            remote_base_url: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
        }
    }
}
