use crate::{
    Classified, Classifier, Completion, ConditionalTracker, Directive, Environment,
    EvaluateCondition, Fs, IncludeScanner, PreprocessorError, PreprocessorErrorKind, SearchPaths,
    Sink, Splice, Spliced, Truncation, parse_define, parse_undef, resolve,
};
use arrayvec::ArrayVec;
use diagnostics::{Diagnostics, ErrorDiagnostic, WarningDiagnostic};
use log::trace;
use source_files::{Location, Source, SourceFileKey};
use std::path::{Path, PathBuf};

/// Everything a session borrows from its driver while advancing
pub struct Context<'a, 'd> {
    pub sink: &'a mut dyn Sink,
    pub environment: &'a mut Environment,
    pub diagnostics: &'a Diagnostics<'d>,
    pub fs: &'a dyn Fs,
    pub search: &'a SearchPaths,
    pub evaluator: &'a dyn EvaluateCondition,
    pub max_include_depth: usize,
}

impl<'a, 'd> Context<'a, 'd> {
    fn error(&self, kind: PreprocessorErrorKind, source: Source) {
        self.diagnostics.push(ErrorDiagnostic::new(kind, source));
    }
}

#[derive(Clone, Debug)]
pub struct IncludeRequest {
    pub path: PathBuf,
    /// Where the `#include` line starts
    pub source: Source,
}

#[derive(Debug, Default)]
pub struct Advance {
    pub consumed: usize,
    pub written: usize,
    /// Set when the session suspended itself to include another file
    pub include: Option<IncludeRequest>,
}

#[derive(Debug)]
pub enum Finish {
    /// The last line of input was an `#include`, finish again once it is done
    Include(IncludeRequest),
    Done(Completion),
}

#[derive(Clone, Debug)]
enum Scan {
    Text { escape: bool },
    String { escape: bool },
    Character { escape: bool },
    /// A string literal just closed, its quote is held back in case another
    /// literal follows
    PostString { whitespace: Vec<u8> },
}

#[derive(Debug)]
enum Body {
    Include(IncludeScanner),
    Collect { directive: Directive, text: Vec<u8> },
}

impl Body {
    fn new(directive: Directive) -> Self {
        match directive {
            Directive::Include => Self::Include(IncludeScanner::new()),
            _ => Self::Collect {
                directive,
                text: vec![],
            },
        }
    }

    fn accept(&mut self, byte: u8) {
        match self {
            Body::Include(scanner) => scanner.accept(byte),
            Body::Collect { text, .. } => text.push(byte),
        }
    }
}

#[derive(Debug)]
enum LineState {
    Classifying(Classifier),
    Recognized(Body),
}

#[derive(Debug)]
struct DirectiveLine {
    source: Source,
    /// Whitespace before the `#`
    indentation: Vec<u8>,
    splice: Splice,
    state: LineState,
}

#[derive(Debug)]
enum Mode {
    Ordinary(Scan),
    Directive(DirectiveLine),
}

impl Default for Mode {
    fn default() -> Self {
        Self::Ordinary(Scan::Text { escape: false })
    }
}

/// Streaming state of one input being preprocessed.
///
/// Nothing lives on the call stack between chunks, so a chunk may end
/// anywhere: inside a directive name, a string literal or an escape.
#[derive(Debug)]
pub struct Session {
    key: SourceFileKey,
    base: Option<PathBuf>,
    depth: usize,
    mode: Mode,
    post_newline: bool,
    indentation: Vec<u8>,
    conditionals: ConditionalTracker,
    location: Location,
    including: bool,
    output: Vec<u8>,
}

impl Session {
    pub fn new(key: SourceFileKey, base: Option<PathBuf>, depth: usize) -> Self {
        Self {
            key,
            base,
            depth,
            mode: Mode::default(),
            post_newline: true,
            indentation: vec![],
            conditionals: ConditionalTracker::new(),
            location: Location::START,
            including: false,
            output: vec![],
        }
    }

    pub fn key(&self) -> SourceFileKey {
        self.key
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Continues after the included file has completed
    pub fn resume(&mut self) {
        self.including = false;
    }

    /// Processes as much of `chunk` as possible.
    ///
    /// Stops right after an `#include` line that needs another file, the
    /// bytes after it are left for when the session is resumed.
    pub fn advance(
        &mut self,
        chunk: &[u8],
        ctx: &mut Context,
    ) -> Result<Advance, PreprocessorError> {
        let mut advance = Advance::default();

        if self.including {
            return Ok(advance);
        }

        for byte in chunk.iter().copied() {
            let include = self.step(byte, ctx);
            self.location = self.location.advance(byte);
            advance.consumed += 1;

            if include.is_some() {
                self.including = true;
                advance.include = include;
                break;
            }
        }

        advance.written = self.flush(ctx.sink)?;
        Ok(advance)
    }

    /// Ends the input
    pub fn finish(&mut self, ctx: &mut Context) -> Result<Finish, PreprocessorError> {
        let mode = match std::mem::take(&mut self.mode) {
            Mode::Directive(mut line) => {
                let held = line.splice.flush();

                let line = match held {
                    Spliced::Pending => Some(line),
                    held => self.feed_line(line, held),
                };

                if let Some(request) = line.and_then(|line| self.end_directive(line, false, ctx)) {
                    self.including = true;
                    self.flush(ctx.sink)?;
                    return Ok(Finish::Include(request));
                }

                std::mem::take(&mut self.mode)
            }
            mode => mode,
        };

        let completion = match mode {
            Mode::Ordinary(Scan::String { .. }) => Completion::Truncated(Truncation::StringLiteral),
            Mode::Ordinary(Scan::Character { .. }) => {
                Completion::Truncated(Truncation::CharacterConstant)
            }
            Mode::Ordinary(Scan::PostString { whitespace }) => {
                self.emit(b"\"");
                self.emit(&whitespace);
                Completion::Complete
            }
            _ => Completion::Complete,
        };

        if let Completion::Truncated(truncation) = completion {
            ctx.diagnostics.push(WarningDiagnostic::new(
                PreprocessorErrorKind::from(truncation),
                Source::new(self.key, self.location),
            ));
        }

        let indentation = std::mem::take(&mut self.indentation);
        self.emit(&indentation);

        for frame in self.conditionals.finish() {
            ctx.error(PreprocessorErrorKind::UnterminatedConditional, frame.source);
        }

        self.flush(ctx.sink)?;
        Ok(Finish::Done(completion))
    }

    fn flush(&mut self, sink: &mut dyn Sink) -> std::io::Result<usize> {
        let written = self.output.len();

        if written > 0 {
            sink.write(&self.output)?;
            self.output.clear();
        }

        sink.commit()?;
        Ok(written)
    }

    fn emit(&mut self, bytes: &[u8]) {
        if !self.conditionals.is_skipping() {
            self.output.extend_from_slice(bytes);
        }
    }

    fn step(&mut self, byte: u8, ctx: &mut Context) -> Option<IncludeRequest> {
        match std::mem::take(&mut self.mode) {
            Mode::Ordinary(scan) => {
                self.mode = self.scan(byte, scan);
                None
            }
            Mode::Directive(line) => self.directive(byte, line, ctx),
        }
    }

    /// Feeds bytes that were held by a directive line but turned out to be text
    fn rescan(&mut self, byte: u8) {
        self.mode = match std::mem::take(&mut self.mode) {
            Mode::Ordinary(scan) => self.scan(byte, scan),
            directive => directive,
        };
    }

    fn scan(&mut self, byte: u8, scan: Scan) -> Mode {
        match scan {
            Scan::Text { escape } => self.text(byte, escape),
            Scan::String { escape } => self.string(byte, escape),
            Scan::Character { escape } => self.character(byte, escape),
            Scan::PostString { whitespace } => self.post_string(byte, whitespace),
        }
    }

    fn text(&mut self, byte: u8, escape: bool) -> Mode {
        if escape {
            self.emit(&[byte]);
            return Mode::default();
        }

        if self.post_newline {
            match byte {
                b' ' | b'\t' | b'\x0B' | b'\x0C' => {
                    self.indentation.push(byte);
                    return Mode::default();
                }
                b'#' => {
                    return Mode::Directive(DirectiveLine {
                        source: Source::new(self.key, self.location),
                        indentation: std::mem::take(&mut self.indentation),
                        splice: Splice::default(),
                        state: LineState::Classifying(Classifier::new()),
                    });
                }
                _ => {
                    let indentation = std::mem::take(&mut self.indentation);
                    self.emit(&indentation);
                }
            }
        }

        self.emit(&[byte]);

        match byte {
            b'\n' => self.post_newline = true,
            b' ' | b'\t' | b'\r' | b'\x0B' | b'\x0C' => (),
            _ => self.post_newline = false,
        }

        match byte {
            b'"' => Mode::Ordinary(Scan::String { escape: false }),
            b'\'' => Mode::Ordinary(Scan::Character { escape: false }),
            b'\\' => Mode::Ordinary(Scan::Text { escape: true }),
            _ => Mode::default(),
        }
    }

    fn string(&mut self, byte: u8, escape: bool) -> Mode {
        if !escape && byte == b'"' {
            return Mode::Ordinary(Scan::PostString { whitespace: vec![] });
        }

        self.emit(&[byte]);

        Mode::Ordinary(Scan::String {
            escape: !escape && byte == b'\\',
        })
    }

    fn character(&mut self, byte: u8, escape: bool) -> Mode {
        self.emit(&[byte]);

        match byte {
            _ if escape => Mode::Ordinary(Scan::Character { escape: false }),
            b'\\' => Mode::Ordinary(Scan::Character { escape: true }),
            b'\'' => Mode::default(),
            b'\n' => {
                self.post_newline = true;
                Mode::default()
            }
            _ => Mode::Ordinary(Scan::Character { escape: false }),
        }
    }

    fn post_string(&mut self, byte: u8, mut whitespace: Vec<u8>) -> Mode {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C' => {
                whitespace.push(byte);
                Mode::Ordinary(Scan::PostString { whitespace })
            }
            // Adjacent literals merge into one
            b'"' => Mode::Ordinary(Scan::String { escape: false }),
            _ => {
                self.emit(b"\"");

                // Whitespace after the last newline is indentation of a new line
                match whitespace.iter().rposition(|byte| *byte == b'\n') {
                    Some(newline) => {
                        self.emit(&whitespace[..=newline]);
                        self.indentation = whitespace.split_off(newline + 1);
                        self.post_newline = true;
                    }
                    None => self.emit(&whitespace),
                }

                self.text(byte, false)
            }
        }
    }

    fn directive(
        &mut self,
        byte: u8,
        mut line: DirectiveLine,
        ctx: &mut Context,
    ) -> Option<IncludeRequest> {
        match line.splice.feed(byte) {
            Spliced::EndOfLine => self.end_directive(line, true, ctx),
            spliced => {
                if let Some(line) = self.feed_line(line, spliced) {
                    self.mode = Mode::Directive(line);
                }
                None
            }
        }
    }

    /// Gives back the line if it is still a directive
    fn feed_line(&mut self, mut line: DirectiveLine, spliced: Spliced) -> Option<DirectiveLine> {
        let logical = match spliced {
            Spliced::Continuation => ArrayVec::from_iter([b' ']),
            spliced => spliced.raw(),
        };

        for byte in logical {
            match &mut line.state {
                LineState::Classifying(classifier) => match classifier.feed(byte) {
                    Classified::Pending => (),
                    Classified::Directive(directive) => {
                        trace!("Recognized {} at {}", directive, line.source.location);

                        let mut body = Body::new(directive);
                        body.accept(byte);
                        line.state = LineState::Recognized(body);
                    }
                    Classified::Unknown(swallowed) => {
                        self.pass_through(&line, &swallowed, &spliced.raw());
                        return None;
                    }
                },
                LineState::Recognized(body) => body.accept(byte),
            }
        }

        Some(line)
    }

    /// Writes out a line that started like a directive but names none we handle
    fn pass_through(&mut self, line: &DirectiveLine, swallowed: &[u8], raw: &[u8]) {
        self.emit(&line.indentation);
        self.emit(swallowed);
        self.post_newline = false;
        self.mode = Mode::default();

        let held = line.splice.is_pending().then_some(b'\\');

        for byte in raw.iter().copied().chain(held) {
            self.rescan(byte);
        }
    }

    fn end_directive(
        &mut self,
        line: DirectiveLine,
        at_end_of_line: bool,
        ctx: &mut Context,
    ) -> Option<IncludeRequest> {
        self.mode = Mode::default();
        self.post_newline = true;

        let body = match line.state {
            LineState::Recognized(body) => body,
            LineState::Classifying(classifier) => match classifier.finish() {
                Ok(directive) => {
                    trace!("Recognized {} at {}", directive, line.source.location);
                    Body::new(directive)
                }
                Err(swallowed) => {
                    self.emit(&line.indentation);
                    self.emit(&swallowed);

                    if at_end_of_line {
                        self.emit(b"\n");
                    }

                    return None;
                }
            },
        };

        match body {
            Body::Include(scanner) => {
                if self.conditionals.is_skipping() {
                    return None;
                }

                self.include(scanner, line.source, ctx)
            }
            Body::Collect { directive, text } => {
                let text = String::from_utf8_lossy(&text);
                self.execute(directive, &text, line.source, ctx);
                None
            }
        }
    }

    fn include(
        &mut self,
        scanner: IncludeScanner,
        source: Source,
        ctx: &mut Context,
    ) -> Option<IncludeRequest> {
        let (quoting, name) = match scanner.finish() {
            Ok(argument) => argument,
            Err(kind) => {
                ctx.error(kind, source);
                return None;
            }
        };

        if self.depth >= ctx.max_include_depth {
            ctx.error(
                PreprocessorErrorKind::IncludeDepthExceeded(ctx.max_include_depth),
                source,
            );
            return None;
        }

        match resolve(ctx.fs, &name, quoting, self.base(), ctx.search) {
            Some(path) => {
                trace!("Resolved '{}' to {}", name, path.display());
                Some(IncludeRequest { path, source })
            }
            None => {
                ctx.error(PreprocessorErrorKind::IncludeNotFound(name), source);
                None
            }
        }
    }

    fn execute(&mut self, directive: Directive, text: &str, source: Source, ctx: &mut Context) {
        let skipping = self.conditionals.is_skipping();
        let evaluator = ctx.evaluator;

        let result = match directive {
            Directive::Define if skipping => Ok(()),
            Directive::Define => {
                parse_define(text, source).map(|define| ctx.environment.add_define(define))
            }
            Directive::Undef if skipping => Ok(()),
            Directive::Undef => parse_undef(text).map(|name| {
                ctx.environment.remove_define(name);
            }),
            Directive::If | Directive::IfDef | Directive::IfNDef => {
                let environment = &*ctx.environment;

                self.conditionals.push(source, || {
                    evaluator.evaluate(directive, text, environment)
                });
                Ok(())
            }
            Directive::Elif => {
                let environment = &*ctx.environment;

                self.conditionals
                    .elif(|| evaluator.evaluate(directive, text, environment))
            }
            Directive::Else => self.conditionals.else_branch(),
            Directive::EndIf => self.conditionals.pop().map(|_| ()),
            Directive::Include => Err(PreprocessorErrorKind::MalformedInclude),
        };

        if let Err(kind) = result {
            ctx.error(kind, source);
        }
    }
}
