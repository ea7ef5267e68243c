use crate::{MemoryInput, Readable, ReaderInput};
use std::{
    collections::HashMap,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

pub trait Fs {
    fn is_file(&self, path: &Path) -> bool;
    fn open(&self, path: &Path, chunk_size: usize) -> std::io::Result<Box<dyn Readable>>;
}

pub struct BlockingFs;

impl Fs for BlockingFs {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn open(&self, path: &Path, chunk_size: usize) -> std::io::Result<Box<dyn Readable>> {
        Ok(Box::new(ReaderInput::new(File::open(path)?, chunk_size)))
    }
}

/// File system held entirely in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryFs {
    files: HashMap<PathBuf, Arc<[u8]>>,
    stalling: bool,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opened files will report `WouldBlock` before every chunk
    pub fn stalling(self) -> Self {
        Self {
            stalling: true,
            ..self
        }
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) {
        self.files
            .insert(path.into(), Arc::from(content.as_ref()));
    }

    pub fn with(mut self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> Self {
        self.add(path, content);
        self
    }
}

impl Fs for MemoryFs {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn open(&self, path: &Path, chunk_size: usize) -> std::io::Result<Box<dyn Readable>> {
        let Some(content) = self.files.get(path) else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No such file '{}'", path.display()),
            ));
        };

        let input = MemoryInput::new(content.clone(), chunk_size);

        Ok(Box::new(if self.stalling {
            input.stalling()
        } else {
            input
        }))
    }
}

#[test]
fn test_memory_fs() {
    let fs = MemoryFs::new().with("/a/b.h", "int x;");

    assert!(fs.is_file(Path::new("/a/b.h")));
    assert!(!fs.is_file(Path::new("/a/c.h")));
    assert!(fs.open(Path::new("/a/b.h"), 16).is_ok());

    let missing = fs.open(Path::new("/a/c.h"), 16);
    assert!(matches!(missing, Err(err) if err.kind() == std::io::ErrorKind::NotFound));
}
