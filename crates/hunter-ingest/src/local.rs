use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::archive::ArchiveReader;

/// Archive files on the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalArchive;

impl ArchiveReader for LocalArchive {
    fn size(&mut self, path: &Path) -> Option<u64> {
        std::fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    fn open(&mut self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(path)?))
    }
}
