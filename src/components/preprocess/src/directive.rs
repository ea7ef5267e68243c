use arrayvec::ArrayVec;
use derive_more::IsVariant;
use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum Directive {
    Include,
    Define,
    Undef,
    If,
    IfDef,
    IfNDef,
    Elif,
    Else,
    EndIf,
}

impl Directive {
    pub const ALL: [Directive; 9] = [
        Directive::Include,
        Directive::Define,
        Directive::Undef,
        Directive::If,
        Directive::IfDef,
        Directive::IfNDef,
        Directive::Elif,
        Directive::Else,
        Directive::EndIf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Directive::Include => "include",
            Directive::Define => "define",
            Directive::Undef => "undef",
            Directive::If => "if",
            Directive::IfDef => "ifdef",
            Directive::IfNDef => "ifndef",
            Directive::Elif => "elif",
            Directive::Else => "else",
            Directive::EndIf => "endif",
        }
    }

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.name())
    }
}

/// Directives that are still possible given the name bytes seen so far
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Candidates(u16);

impl Candidates {
    pub const ALL: Self = Self((1 << Directive::ALL.len()) - 1);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, directive: Directive) -> bool {
        self.0 & directive.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Directive> {
        Directive::ALL
            .into_iter()
            .filter(move |directive| self.contains(*directive))
    }

    /// Keeps only the directives whose name has `byte` at `cursor`
    pub fn narrow(self, cursor: usize, byte: u8) -> Self {
        Self(
            self.iter()
                .filter(|directive| directive.name().as_bytes().get(cursor) == Some(&byte))
                .fold(0, |bits, directive| bits | directive.bit()),
        )
    }

    /// The directive whose name is exactly `cursor` bytes long, if still possible
    pub fn exact(self, cursor: usize) -> Option<Directive> {
        self.iter()
            .find(|directive| directive.name().len() == cursor)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Classified {
    /// Not decided yet, more bytes are needed
    Pending,
    /// The name was terminated by the byte just fed, which belongs to the body
    Directive(Directive),
    /// Not a known directive, these bytes (including the `#`) were swallowed
    /// and must be written out as they were
    Unknown(Vec<u8>),
}

/// Identifies the directive named after a `#` one byte at a time.
///
/// The only state is how many name bytes have matched and which directives
/// could still match, so the input may be split anywhere.
#[derive(Clone, Debug)]
pub struct Classifier {
    cursor: usize,
    candidates: Candidates,
    indent: Vec<u8>,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            cursor: 0,
            candidates: Candidates::ALL,
            indent: vec![],
        }
    }

    pub fn feed(&mut self, byte: u8) -> Classified {
        if self.cursor == 0 && matches!(byte, b' ' | b'\t' | b'\x0B' | b'\x0C') {
            self.indent.push(byte);
            return Classified::Pending;
        }

        if byte.is_ascii_alphanumeric() || byte == b'_' {
            let narrowed = self.candidates.narrow(self.cursor, byte);

            if narrowed.is_empty() {
                return Classified::Unknown(self.swallowed());
            }

            self.candidates = narrowed;
            self.cursor += 1;
            return Classified::Pending;
        }

        self.finish()
            .map_or_else(Classified::Unknown, Classified::Directive)
    }

    /// Decides on the name seen so far, used at the end of the line or input.
    ///
    /// Gives back the swallowed bytes when the name is not a known directive.
    pub fn finish(&self) -> Result<Directive, Vec<u8>> {
        self.candidates
            .exact(self.cursor)
            .ok_or_else(|| self.swallowed())
    }

    fn swallowed(&self) -> Vec<u8> {
        let name = self
            .candidates
            .iter()
            .next()
            .map(|directive| &directive.name().as_bytes()[..self.cursor])
            .unwrap_or_default();

        let mut bytes = Vec::with_capacity(1 + self.indent.len() + name.len());
        bytes.push(b'#');
        bytes.extend_from_slice(&self.indent);
        bytes.extend_from_slice(name);
        bytes
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Spliced {
    Pending,
    Byte(u8),
    /// A backslash that did not start a line continuation, then this byte
    Escaped(u8),
    /// Backslash followed by a newline
    Continuation,
    EndOfLine,
}

impl Spliced {
    /// The input bytes this result stands for
    pub fn raw(&self) -> ArrayVec<u8, 2> {
        let mut raw = ArrayVec::new();

        match self {
            Spliced::Pending => (),
            Spliced::Byte(byte) => raw.push(*byte),
            Spliced::Escaped(byte) => raw.extend([b'\\', *byte]),
            Spliced::Continuation => raw.extend([b'\\', b'\n']),
            Spliced::EndOfLine => raw.push(b'\n'),
        }

        raw
    }
}

/// Joins directive lines continued with a trailing backslash
#[derive(Copy, Clone, Debug, Default)]
pub struct Splice {
    escape: bool,
}

impl Splice {
    pub fn feed(&mut self, byte: u8) -> Spliced {
        if std::mem::take(&mut self.escape) {
            return match byte {
                b'\n' => Spliced::Continuation,
                b'\\' => {
                    self.escape = true;
                    Spliced::Byte(b'\\')
                }
                _ => Spliced::Escaped(byte),
            };
        }

        match byte {
            b'\\' => {
                self.escape = true;
                Spliced::Pending
            }
            b'\n' => Spliced::EndOfLine,
            _ => Spliced::Byte(byte),
        }
    }

    /// Whether a backslash is being held back
    pub fn is_pending(&self) -> bool {
        self.escape
    }

    /// Releases a held back backslash at the end of input
    pub fn flush(&mut self) -> Spliced {
        if std::mem::take(&mut self.escape) {
            Spliced::Byte(b'\\')
        } else {
            Spliced::Pending
        }
    }
}

#[cfg(test)]
fn classify(line: &[u8]) -> (Classified, usize) {
    let mut classifier = Classifier::new();

    for (i, byte) in line.iter().enumerate() {
        match classifier.feed(*byte) {
            Classified::Pending => continue,
            decided => return (decided, i),
        }
    }

    let finished = classifier
        .finish()
        .map_or_else(Classified::Unknown, Classified::Directive);

    (finished, line.len())
}

#[test]
fn test_classify_every_directive() {
    for directive in Directive::ALL {
        for terminator in [b" ", b"\t", b"(", b"<", b"\"", b"\\"] {
            let line = [directive.name().as_bytes(), terminator.as_slice()].concat();

            assert_eq!(
                classify(&line),
                (Classified::Directive(directive), directive.name().len())
            );
        }

        assert_eq!(
            classify(directive.name().as_bytes()),
            (Classified::Directive(directive), directive.name().len())
        );
    }
}

#[test]
fn test_classify_shared_prefixes() {
    assert_eq!(classify(b"if x").0, Classified::Directive(Directive::If));
    assert_eq!(classify(b"ifdef x").0, Classified::Directive(Directive::IfDef));
    assert_eq!(classify(b"ifndef x").0, Classified::Directive(Directive::IfNDef));
    assert_eq!(classify(b"elif").0, Classified::Directive(Directive::Elif));
    assert_eq!(classify(b"else").0, Classified::Directive(Directive::Else));
    assert_eq!(classify(b"endif").0, Classified::Directive(Directive::EndIf));
}

#[test]
fn test_classify_unknown_keeps_swallowed_bytes() {
    assert_eq!(classify(b"pragma once"), (Classified::Unknown(b"#".to_vec()), 0));
    assert_eq!(classify(b"ifx"), (Classified::Unknown(b"#if".to_vec()), 2));
    assert_eq!(classify(b"elsewhere"), (Classified::Unknown(b"#else".to_vec()), 4));
    assert_eq!(classify(b"inc "), (Classified::Unknown(b"#inc".to_vec()), 3));
    assert_eq!(classify(b" \terror"), (Classified::Unknown(b"# \te".to_vec()), 3));
    assert_eq!(classify(b""), (Classified::Unknown(b"#".to_vec()), 0));
}

#[test]
fn test_classify_after_indentation() {
    assert_eq!(
        classify(b"  define X"),
        (Classified::Directive(Directive::Define), 8)
    );
}

#[test]
fn test_classify_after_vertical_whitespace() {
    assert_eq!(
        classify(b"\x0Bdefine X 1"),
        (Classified::Directive(Directive::Define), 7)
    );
    assert_eq!(
        classify(b"\x0C\tifdef X"),
        (Classified::Directive(Directive::IfDef), 7)
    );
    assert_eq!(
        classify(b"\x0Bpragma"),
        (Classified::Unknown(b"#\x0B".to_vec()), 1)
    );
}

#[test]
fn test_splice() {
    let mut splice = Splice::default();

    let results = b"a\\\nb\\c\\\\\n"
        .iter()
        .map(|byte| splice.feed(*byte))
        .collect::<Vec<_>>();

    assert_eq!(
        results,
        [
            Spliced::Byte(b'a'),
            Spliced::Pending,
            Spliced::Continuation,
            Spliced::Byte(b'b'),
            Spliced::Pending,
            Spliced::Escaped(b'c'),
            Spliced::Pending,
            Spliced::Byte(b'\\'),
            Spliced::Continuation,
        ]
    );
    assert!(!splice.is_pending());
}
