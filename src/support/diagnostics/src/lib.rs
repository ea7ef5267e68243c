mod error;
mod notice;
mod show;
mod warning;

use append_only_vec::AppendOnlyVec;
use core::fmt::Debug;
use derive_more::{Display, IsVariant};
pub use error::ErrorDiagnostic;
pub use notice::NoticeDiagnostic;
pub use show::{Show, minimal_filename};
use source_files::SourceFiles;
pub use warning::WarningDiagnostic;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IsVariant)]
pub enum Severity {
    #[display("notice")]
    Notice,
    #[display("warning")]
    Warning,
    #[display("error")]
    Error,
}

pub trait Diagnostic: Show + Send + Sync {
    fn severity(&self) -> Severity;
    fn message(&self) -> &str;
}

#[derive(Clone, Debug)]
pub struct DiagnosticFlags {
    pub print_without_collecting: bool,
    pub minimum_severity: Severity,
}

impl Default for DiagnosticFlags {
    fn default() -> Self {
        Self {
            print_without_collecting: true,
            minimum_severity: Severity::Notice,
        }
    }
}

impl DiagnosticFlags {
    pub fn collect() -> Self {
        Self {
            print_without_collecting: false,
            ..Default::default()
        }
    }
}

/// The notice channel of a preprocessing run.
///
/// Anything pushed here is either printed right away or kept until
/// [`Diagnostics::print_all`] is called, depending on the flags.
pub struct Diagnostics<'a> {
    source_files: &'a SourceFiles,
    diagnostics: AppendOnlyVec<Box<dyn Diagnostic>>,
    flags: DiagnosticFlags,
}

impl<'a> Debug for Diagnostics<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

impl<'a> Diagnostics<'a> {
    pub fn new(source_files: &'a SourceFiles, flags: DiagnosticFlags) -> Self {
        Self {
            source_files,
            diagnostics: AppendOnlyVec::<Box<dyn Diagnostic>>::new(),
            flags,
        }
    }

    pub fn flags(&self) -> &DiagnosticFlags {
        &self.flags
    }

    pub fn source_files(&self) -> &'a SourceFiles {
        self.source_files
    }

    pub fn push(&self, diagnostic: impl Diagnostic + 'static) {
        if diagnostic.severity() < self.flags.minimum_severity {
            return;
        }

        if self.flags.print_without_collecting {
            self.print(&diagnostic);
        } else {
            self.diagnostics.push(Box::new(diagnostic));
        }
    }

    pub fn print_all(&self) {
        for diagnostic in self.diagnostics.iter() {
            self.print(&**diagnostic);
        }
    }

    pub fn print(&self, diagnostic: &dyn Diagnostic) {
        let mut message = String::new();

        if diagnostic.show(&mut message, self.source_files).is_ok() {
            eprintln!("{message}");
        }
    }

    /// Collected diagnostics as `(severity, message)` pairs, in push order
    pub fn collected(&self) -> Vec<(Severity, String)> {
        self.diagnostics
            .iter()
            .map(|diagnostic| (diagnostic.severity(), diagnostic.message().to_string()))
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity() == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

#[test]
fn test_collects_when_asked() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    diagnostics.push(WarningDiagnostic::plain("first"));
    diagnostics.push(ErrorDiagnostic::plain("second"));
    diagnostics.push(NoticeDiagnostic::plain("third"));

    assert_eq!(
        diagnostics.collected(),
        vec![
            (Severity::Warning, "first".to_string()),
            (Severity::Error, "second".to_string()),
            (Severity::Notice, "third".to_string()),
        ]
    );
    assert!(diagnostics.has_errors());
}

#[test]
fn test_minimum_severity_filters() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(
        &source_files,
        DiagnosticFlags {
            print_without_collecting: false,
            minimum_severity: Severity::Warning,
        },
    );

    diagnostics.push(NoticeDiagnostic::plain("ignored"));
    diagnostics.push(WarningDiagnostic::plain("kept"));

    assert_eq!(diagnostics.count(Severity::Notice), 0);
    assert_eq!(diagnostics.count(Severity::Warning), 1);
}
