use crate::{Diagnostic, Severity, minimal_filename, show::Show};
use colored::Colorize;
use source_files::{Source, SourceFiles};

#[derive(Debug)]
pub struct ErrorDiagnostic {
    message: String,
    source: Option<Source>,
}

impl ErrorDiagnostic {
    pub fn new(message: impl ToString, source: Source) -> Self {
        Self {
            message: message.to_string(),
            source: Some(source),
        }
    }

    pub fn plain(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            source: None,
        }
    }

    pub fn source(&self) -> Option<Source> {
        self.source
    }
}

impl Show for ErrorDiagnostic {
    fn show(&self, w: &mut dyn std::fmt::Write, source_files: &SourceFiles) -> std::fmt::Result {
        if let Some(source) = self.source {
            write!(
                w,
                "{}:{}:{}: {} {}",
                minimal_filename(source, source_files),
                source.location.line,
                source.location.column,
                "error:".red().bold(),
                self.message,
            )
        } else {
            write!(w, "{} {}", "error:".red().bold(), self.message)
        }
    }
}

impl Diagnostic for ErrorDiagnostic {
    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &str {
        &self.message
    }
}
