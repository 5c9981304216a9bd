//! Bounded media catalog built once from the media folder.

use core::ops::ControlFlow;

use heapless::{String, Vec};
use log::{debug, info};

use crate::storage::{DirEntry, MediaStorage};

pub const CATALOG_MAX_ENTRIES: usize = 10;
pub const MEDIA_NAME_BYTES: usize = 64;
pub const MEDIA_SUFFIX: &str = ".mjpeg";
// FAT drivers without long-name support report the 8.3 alias.
const MEDIA_SHORT_SUFFIX: &str = ".mjp";
const HIDDEN_PREFIXES: [&str; 2] = [".", "~"];
const OS_ARTIFACTS: [&str; 4] = [
    "thumbs.db",
    "desktop.ini",
    "system volume information",
    "system~1",
];

/// One playable file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MediaEntry {
    name: String<MEDIA_NAME_BYTES>,
    size_bytes: u32,
}

impl MediaEntry {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub const fn size_bytes(&self) -> u32 {
        self.size_bytes
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CatalogLoadResult {
    pub loaded: u16,
    pub skipped: u16,
    pub truncated: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Admission {
    Accepted,
    Skipped,
    Full,
}

/// Ordered list of media entries in driver enumeration order.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<MediaEntry, CATALOG_MAX_ENTRIES>,
}

impl Catalog {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Enumerates `folder` once. An unreadable folder is returned as an error;
    /// entries past the bound are dropped silently.
    pub fn build<S>(storage: &mut S, folder: &str) -> Result<(Self, CatalogLoadResult), S::Error>
    where
        S: MediaStorage,
    {
        let mut catalog = Self::new();
        let mut result = CatalogLoadResult::default();

        storage.list_dir(folder, |entry| catalog.visit(entry, &mut result))?;

        info!(
            "catalog: folder={} loaded={} skipped={} truncated={}",
            folder, result.loaded, result.skipped, result.truncated
        );
        for (index, entry) in catalog.iter().enumerate() {
            info!(
                "catalog: [{}] {} ({} bytes)",
                index,
                entry.name(),
                entry.size_bytes()
            );
        }

        Ok((catalog, result))
    }

    /// Builds a catalog from an in-memory directory snapshot.
    pub fn from_entries<'a, I>(entries: I) -> (Self, CatalogLoadResult)
    where
        I: IntoIterator<Item = DirEntry<'a>>,
    {
        let mut catalog = Self::new();
        let mut result = CatalogLoadResult::default();
        for entry in entries {
            if catalog.visit(entry, &mut result).is_break() {
                break;
            }
        }
        (catalog, result)
    }

    fn visit(&mut self, entry: DirEntry<'_>, result: &mut CatalogLoadResult) -> ControlFlow<()> {
        match self.admit(entry) {
            Admission::Accepted => {
                result.loaded = result.loaded.saturating_add(1);
                ControlFlow::Continue(())
            }
            Admission::Skipped => {
                result.skipped = result.skipped.saturating_add(1);
                ControlFlow::Continue(())
            }
            Admission::Full => {
                result.truncated = true;
                ControlFlow::Break(())
            }
        }
    }

    fn admit(&mut self, entry: DirEntry<'_>) -> Admission {
        if entry.is_dir || entry.is_hidden || !is_playable_name(entry.name) {
            debug!("catalog: skip {}", entry.name);
            return Admission::Skipped;
        }

        if self.entries.is_full() {
            return Admission::Full;
        }

        let mut name = String::new();
        if name.push_str(entry.name).is_err() {
            debug!("catalog: skip {} (name too long)", entry.name);
            return Admission::Skipped;
        }

        match self.entries.push(MediaEntry {
            name,
            size_bytes: entry.size_bytes,
        }) {
            Ok(()) => Admission::Accepted,
            Err(_) => Admission::Full,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaEntry> {
        self.entries.iter()
    }
}

/// Media suffix check plus hidden/OS artifact filtering on the bare name.
pub fn is_playable_name(name: &str) -> bool {
    if name.is_empty() || is_hidden_or_artifact(name) {
        return false;
    }

    ends_with_ignore_ascii_case(name, MEDIA_SUFFIX)
        || ends_with_ignore_ascii_case(name, MEDIA_SHORT_SUFFIX)
}

fn is_hidden_or_artifact(name: &str) -> bool {
    HIDDEN_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        || OS_ARTIFACTS
            .iter()
            .any(|artifact| name.eq_ignore_ascii_case(artifact))
}

fn ends_with_ignore_ascii_case(name: &str, suffix: &str) -> bool {
    let (name, suffix) = (name.as_bytes(), suffix.as_bytes());
    name.len() > suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
