//! Backdrop image cache
//!
//! The backdrop is fetched at most once per process and shared read-only
//! afterwards. A failed fetch is cached as "no backdrop"; it never reaches
//! the movement or render loops.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::{SimError, SimResult};

/// Raw backdrop image bytes and where they came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backdrop {
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// Where backdrop bytes come from
pub trait BackdropSource {
    /// Human-readable origin for logs
    fn describe(&self) -> String;
    fn fetch(&self) -> SimResult<Vec<u8>>;
}

/// Backdrop read from a local file
#[derive(Debug, Clone)]
pub struct FileBackdrop(pub PathBuf);

impl BackdropSource for FileBackdrop {
    fn describe(&self) -> String {
        self.0.display().to_string()
    }

    fn fetch(&self) -> SimResult<Vec<u8>> {
        let bytes = std::fs::read(&self.0)?;
        if bytes.is_empty() {
            return Err(SimError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "backdrop file is empty",
            )));
        }
        Ok(bytes)
    }
}

/// Init-once slot holding the outcome of the first fetch
#[derive(Debug, Default)]
pub struct BackdropCache {
    slot: OnceLock<Option<Backdrop>>,
}

impl BackdropCache {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Fetch on first call, return the cached outcome afterwards
    pub fn load_once(&self, source: &dyn BackdropSource) -> Option<&Backdrop> {
        self.slot
            .get_or_init(|| match source.fetch() {
                Ok(bytes) => {
                    log::info!("Loaded backdrop from {} ({} bytes)", source.describe(), bytes.len());
                    Some(Backdrop {
                        origin: source.describe(),
                        bytes,
                    })
                }
                Err(e) => {
                    log::warn!("No backdrop: {} ({})", source.describe(), e);
                    None
                }
            })
            .as_ref()
    }

    /// Cached backdrop, if a load happened and succeeded
    pub fn get(&self) -> Option<&Backdrop> {
        self.slot.get().and_then(Option::as_ref)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }
}

static BACKDROP: BackdropCache = BackdropCache::new();

/// Load the process-wide backdrop (first call only)
pub fn load_once(source: &dyn BackdropSource) -> Option<&'static Backdrop> {
    BACKDROP.load_once(source)
}

/// Process-wide backdrop, if loaded
pub fn cached() -> Option<&'static Backdrop> {
    BACKDROP.get()
}
