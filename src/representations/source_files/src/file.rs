use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct SourceFile {
    filepath: PathBuf,
}

impl SourceFile {
    pub fn new(filepath: PathBuf) -> Self {
        Self { filepath }
    }

    pub fn filename(&self) -> &str {
        self.filepath
            .to_str()
            .unwrap_or("<invalid unicode filename>")
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// Directory containing this file, used to resolve quoted includes
    pub fn base_directory(&self) -> Option<&Path> {
        self.filepath
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }
}
