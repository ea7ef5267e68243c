use derive_more::IsVariant;
use diagnostics::{Show, minimal_filename};
use source_files::{Source, SourceFiles};
use std::fmt::Display;

#[derive(Clone, Debug)]
pub struct PreprocessorError {
    pub kind: PreprocessorErrorKind,
    pub source: Source,
}

impl PreprocessorError {
    pub fn new(kind: PreprocessorErrorKind, source: Source) -> Self {
        Self { kind, source }
    }
}

impl From<std::io::Error> for PreprocessorError {
    fn from(value: std::io::Error) -> Self {
        PreprocessorErrorKind::Io(value.to_string()).at(Source::internal())
    }
}

impl Show for PreprocessorError {
    fn show(&self, w: &mut dyn std::fmt::Write, source_files: &SourceFiles) -> std::fmt::Result {
        if self.source.is_internal() {
            return write!(w, "error: {}", self.kind);
        }

        write!(
            w,
            "{}:{}:{}: error: {}",
            minimal_filename(self.source, source_files),
            self.source.location.line,
            self.source.location.column,
            self.kind
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum PreprocessorErrorKind {
    UnterminatedStringLiteral,
    UnterminatedCharacterConstant,
    MalformedInclude,
    IncludeNotFound(String),
    IncludeDepthExceeded(usize),
    CannotOpenInclude(String),
    MalformedDefine,
    MalformedUndef,
    UnmatchedEndif,
    UnmatchedElse,
    UnmatchedElif,
    ElseAfterElse,
    ElifAfterElse,
    UnterminatedConditional,
    Io(String),
}

impl PreprocessorErrorKind {
    pub fn at(self, source: Source) -> PreprocessorError {
        PreprocessorError::new(self, source)
    }
}

impl Display for PreprocessorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessorErrorKind::UnterminatedStringLiteral => {
                write!(f, "Unterminated string literal")
            }
            PreprocessorErrorKind::UnterminatedCharacterConstant => {
                write!(f, "Unterminated character constant")
            }
            PreprocessorErrorKind::MalformedInclude => {
                write!(f, "Expected \"FILENAME\" or <FILENAME> after #include")
            }
            PreprocessorErrorKind::IncludeNotFound(name) => {
                write!(f, "Cannot find include file '{}'", name)
            }
            PreprocessorErrorKind::IncludeDepthExceeded(limit) => {
                write!(f, "#include nested more than {} levels deep", limit)
            }
            PreprocessorErrorKind::CannotOpenInclude(message) => {
                write!(f, "Cannot open include file - {}", message)
            }
            PreprocessorErrorKind::MalformedDefine => write!(f, "Expected macro name after #define"),
            PreprocessorErrorKind::MalformedUndef => write!(f, "Expected macro name after #undef"),
            PreprocessorErrorKind::UnmatchedEndif => write!(f, "#endif without #if"),
            PreprocessorErrorKind::UnmatchedElse => write!(f, "#else without #if"),
            PreprocessorErrorKind::UnmatchedElif => write!(f, "#elif without #if"),
            PreprocessorErrorKind::ElseAfterElse => write!(f, "#else after #else"),
            PreprocessorErrorKind::ElifAfterElse => write!(f, "#elif after #else"),
            PreprocessorErrorKind::UnterminatedConditional => {
                write!(f, "Unterminated conditional directive")
            }
            PreprocessorErrorKind::Io(message) => write!(f, "{}", message),
        }
    }
}

/// How a stream ended.
///
/// Running out of input inside a literal is not fatal: whatever was buffered
/// is flushed and the stream is reported as truncated rather than invalid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Completion {
    Complete,
    Truncated(Truncation),
}

impl Completion {
    /// Keeps the first truncation seen across several streams
    pub fn merge(self, other: Completion) -> Completion {
        match self {
            Completion::Complete => other,
            Completion::Truncated(_) => self,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Truncation {
    StringLiteral,
    CharacterConstant,
}

impl From<Truncation> for PreprocessorErrorKind {
    fn from(value: Truncation) -> Self {
        match value {
            Truncation::StringLiteral => PreprocessorErrorKind::UnterminatedStringLiteral,
            Truncation::CharacterConstant => PreprocessorErrorKind::UnterminatedCharacterConstant,
        }
    }
}
