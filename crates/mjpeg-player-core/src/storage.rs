//! Storage driver seam: directory enumeration and sequential file reads.

use core::ops::ControlFlow;

/// One directory entry as reported by the storage driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DirEntry<'a> {
    pub name: &'a str,
    pub size_bytes: u32,
    pub is_dir: bool,
    /// Hidden or system attribute set by the filesystem.
    pub is_hidden: bool,
}

impl<'a> DirEntry<'a> {
    pub const fn file(name: &'a str, size_bytes: u32) -> Self {
        Self {
            name,
            size_bytes,
            is_dir: false,
            is_hidden: false,
        }
    }

    pub const fn dir(name: &'a str) -> Self {
        Self {
            name,
            size_bytes: 0,
            is_dir: true,
            is_hidden: false,
        }
    }

    pub const fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

/// Why a media file could not be opened.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OpenError<E> {
    NotFound,
    IsDirectory,
    Storage(E),
}

/// Forward-only byte stream over one open file.
///
/// Dropping the stream closes the underlying file.
pub trait ByteStream {
    type Error;

    /// Reads up to `buf.len()` bytes; `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn is_eof(&self) -> bool;
}

/// Mounted volume holding the media folder.
pub trait MediaStorage {
    type Error: core::fmt::Debug;
    type Stream<'s>: ByteStream<Error = Self::Error>
    where
        Self: 's;

    /// Visits entries of `folder` in driver order until `visit` breaks.
    fn list_dir<F>(&mut self, folder: &str, visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(DirEntry<'_>) -> ControlFlow<()>;

    fn open<'s>(
        &'s mut self,
        folder: &str,
        name: &str,
    ) -> Result<Self::Stream<'s>, OpenError<Self::Error>>;
}
