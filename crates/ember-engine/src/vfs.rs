//! Filesystem collaborator interface.
//!
//! The rendering core never walks the filesystem itself; cursor and icon
//! loading consume whole byte buffers through this seam so hosts can mount
//! archives or embedded assets.

use anyhow::{Context, Result};

/// Byte-buffer resource access.
pub trait Vfs {
    /// Reads the full contents of `path`.
    fn open(&self, path: &str) -> Result<Vec<u8>>;
}

/// Plain-disk implementation backed by `std::fs`.
#[derive(Debug, Default, Clone)]
pub struct DiskVfs;

impl Vfs for DiskVfs {
    fn open(&self, path: &str) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("failed to read '{path}'"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// In-memory Vfs for tests.
    #[derive(Default)]
    pub struct MemVfs {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemVfs {
        pub fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
            self.files.insert(path.to_string(), bytes);
            self
        }
    }

    impl Vfs for MemVfs {
        fn open(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .with_context(|| format!("no such file '{path}'"))
        }
    }
}
