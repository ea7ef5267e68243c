use crate::{Fs, PreprocessorErrorKind};
use derive_more::IsVariant;
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum IncludeQuoting {
    /// `<name>`
    Angle,
    /// `"name"`
    Quoted,
}

#[derive(Clone, Debug, Default)]
pub struct SearchPaths {
    pub include_dirs: Option<Vec<PathBuf>>,
    pub default_dirs: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(include_dirs: Option<Vec<PathBuf>>, default_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            default_dirs,
        }
    }

    /// The directory lists to try, in order
    fn lists(&self) -> impl Iterator<Item = &[PathBuf]> {
        let explicit = self.include_dirs.as_deref();

        let fallback = match explicit {
            Some(explicit) if explicit == self.default_dirs.as_slice() => None,
            Some(_) => Some(self.default_dirs.as_slice()),
            None => None,
        };

        std::iter::once(explicit.unwrap_or(&self.default_dirs)).chain(fallback)
    }
}

/// Finds the file an `#include` refers to.
///
/// Quoted names are tried relative to the including file's directory first.
/// Both forms then walk the explicit search list, and finally the default
/// list when the explicit list is a different one.
pub fn resolve(
    fs: &dyn Fs,
    name: &str,
    quoting: IncludeQuoting,
    base: Option<&Path>,
    search: &SearchPaths,
) -> Option<PathBuf> {
    if quoting.is_quoted() {
        if let Some(base) = base {
            let candidate = base.join(name);

            if fs.is_file(&candidate) {
                return Some(candidate);
            }
        }
    }

    search
        .lists()
        .flatten()
        .map(|dir| dir.join(name))
        .find(|candidate| fs.is_file(candidate))
}

#[derive(Clone, Debug, Default)]
enum ScanState {
    #[default]
    Leading,
    Angle(Vec<u8>),
    Quoted(Vec<u8>),
    Done(IncludeQuoting, Vec<u8>),
    Malformed,
}

/// Collects the filename argument of an `#include` line one byte at a time
#[derive(Clone, Debug, Default)]
pub struct IncludeScanner {
    state: ScanState,
}

impl IncludeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, byte: u8) {
        self.state = match std::mem::take(&mut self.state) {
            ScanState::Leading => match byte {
                b' ' | b'\t' | b'\x0B' | b'\x0C' => ScanState::Leading,
                b'<' => ScanState::Angle(vec![]),
                b'"' => ScanState::Quoted(vec![]),
                _ => ScanState::Malformed,
            },
            ScanState::Angle(name) if byte == b'>' => ScanState::Done(IncludeQuoting::Angle, name),
            ScanState::Quoted(name) if byte == b'"' => {
                ScanState::Done(IncludeQuoting::Quoted, name)
            }
            ScanState::Angle(mut name) => {
                name.push(byte);
                ScanState::Angle(name)
            }
            ScanState::Quoted(mut name) => {
                name.push(byte);
                ScanState::Quoted(name)
            }
            done @ ScanState::Done(..) => done,
            ScanState::Malformed => ScanState::Malformed,
        };
    }

    pub fn finish(self) -> Result<(IncludeQuoting, String), PreprocessorErrorKind> {
        match self.state {
            ScanState::Done(quoting, name) if !name.is_empty() => {
                Ok((quoting, String::from_utf8_lossy(&name).into_owned()))
            }
            _ => Err(PreprocessorErrorKind::MalformedInclude),
        }
    }
}

#[cfg(test)]
fn scan(body: &str) -> Result<(IncludeQuoting, String), PreprocessorErrorKind> {
    let mut scanner = IncludeScanner::new();
    body.bytes().for_each(|byte| scanner.accept(byte));
    scanner.finish()
}

#[test]
fn test_scan_include_argument() {
    assert_eq!(
        scan(" <stdio.h>"),
        Ok((IncludeQuoting::Angle, "stdio.h".into()))
    );
    assert_eq!(
        scan("\t\"sys/my header.h\"  "),
        Ok((IncludeQuoting::Quoted, "sys/my header.h".into()))
    );
    assert_eq!(scan(" stdio.h"), Err(PreprocessorErrorKind::MalformedInclude));
    assert_eq!(scan(" <stdio.h"), Err(PreprocessorErrorKind::MalformedInclude));
    assert_eq!(scan(" \"\""), Err(PreprocessorErrorKind::MalformedInclude));
    assert_eq!(scan(""), Err(PreprocessorErrorKind::MalformedInclude));
}

#[cfg(test)]
fn resolution_fixture() -> (crate::MemoryFs, SearchPaths) {
    let fs = crate::MemoryFs::new()
        .with("/X/f.h", "")
        .with("/A/f.h", "")
        .with("/D/f.h", "")
        .with("/B/only_b.h", "")
        .with("/D/only_d.h", "");

    let search = SearchPaths::new(
        Some(vec!["/A".into(), "/B".into()]),
        vec!["/D".into()],
    );

    (fs, search)
}

#[test]
fn test_resolve_quoted_prefers_base_directory() {
    let (fs, search) = resolution_fixture();

    assert_eq!(
        resolve(&fs, "f.h", IncludeQuoting::Quoted, Some(Path::new("/X")), &search),
        Some(PathBuf::from("/X/f.h"))
    );
}

#[test]
fn test_resolve_angle_ignores_base_directory() {
    let (fs, search) = resolution_fixture();

    assert_eq!(
        resolve(&fs, "f.h", IncludeQuoting::Angle, Some(Path::new("/X")), &search),
        Some(PathBuf::from("/A/f.h"))
    );
}

#[test]
fn test_resolve_falls_back_to_defaults() {
    let (fs, search) = resolution_fixture();

    assert_eq!(
        resolve(&fs, "only_b.h", IncludeQuoting::Quoted, Some(Path::new("/X")), &search),
        Some(PathBuf::from("/B/only_b.h"))
    );
    assert_eq!(
        resolve(&fs, "only_d.h", IncludeQuoting::Angle, None, &search),
        Some(PathBuf::from("/D/only_d.h"))
    );
    assert_eq!(
        resolve(&fs, "missing.h", IncludeQuoting::Quoted, Some(Path::new("/X")), &search),
        None
    );
}

#[test]
fn test_resolve_without_explicit_list() {
    let (fs, _) = resolution_fixture();
    let search = SearchPaths::new(None, vec!["/D".into()]);

    assert_eq!(
        resolve(&fs, "f.h", IncludeQuoting::Angle, None, &search),
        Some(PathBuf::from("/D/f.h"))
    );
    assert_eq!(
        resolve(&fs, "only_b.h", IncludeQuoting::Angle, None, &search),
        None
    );
}
