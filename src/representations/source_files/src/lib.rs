mod file;
mod key;
mod source;

use append_only_vec::AppendOnlyVec;
pub use file::SourceFile;
pub use key::SourceFileKey;
pub use line_column::Location;
pub use source::Source;
use std::{fmt::Debug, path::PathBuf};

/// Registry of every file a preprocessing run has opened.
///
/// Files are only ever appended, so a [`SourceFileKey`] stays valid for the
/// lifetime of the registry and can be handed out through a shared reference.
pub struct SourceFiles {
    files: AppendOnlyVec<SourceFile>,
}

impl Debug for SourceFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.files.iter()).finish()
    }
}

impl SourceFiles {
    pub const INTERNAL_KEY: SourceFileKey = SourceFileKey(0);

    pub fn new() -> Self {
        let files = AppendOnlyVec::new();

        // Create the <internal> file, used for predefined macros and command-line options
        let index = files.push(SourceFile::new("<internal>".into()));
        debug_assert_eq!(index, Self::INTERNAL_KEY.0 as usize);

        Self { files }
    }

    pub fn get(&self, key: SourceFileKey) -> &SourceFile {
        &self.files[key.0 as usize]
    }

    /// Registers a file, every call gives a new key.
    ///
    /// # Panics
    ///
    /// Panics if more files are added than a key can address.
    pub fn add(&self, filename: PathBuf) -> SourceFileKey {
        let index = self.files.push(SourceFile::new(filename));
        SourceFileKey(u32::try_from(index).expect("too many source files for a 32-bit key"))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_keys_are_stable() {
    let source_files = SourceFiles::new();
    let a = source_files.add("a.c".into());
    let b = source_files.add("include/b.h".into());

    assert_ne!(a, b);
    assert_ne!(a, SourceFiles::INTERNAL_KEY);
    assert_eq!(source_files.len(), 3);
    assert_eq!(source_files.get(a).filename(), "a.c");
    assert_eq!(source_files.get(b).filename(), "include/b.h");
    assert_eq!(
        source_files.get(SourceFiles::INTERNAL_KEY).filename(),
        "<internal>"
    );
}
