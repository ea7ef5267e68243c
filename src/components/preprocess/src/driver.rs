use crate::{
    AssumeActive, BlockingFs, Completion, Context, Environment, EvaluateCondition, Finish, Fs,
    IncludeRequest, PreprocessOptions, PreprocessorError, PreprocessorErrorKind, ReadStatus,
    Readable, SearchPaths, Session, Sink,
};
use derive_more::IsVariant;
use diagnostics::{Diagnostics, ErrorDiagnostic, WarningDiagnostic};
use log::debug;
use source_files::{SourceFileKey, SourceFiles};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, PartialEq, Eq, IsVariant)]
pub enum Pump {
    Progress,
    /// The current input has nothing to offer right now
    Waiting,
    Finished(Completion),
}

/// Reported once for every session, inner includes before their parents
#[derive(Copy, Clone, Debug)]
pub struct Completed {
    pub key: SourceFileKey,
    pub depth: usize,
    pub completion: Completion,
}

struct Frame {
    session: Session,
    input: Box<dyn Readable>,
    buffer: Vec<u8>,
    /// Bytes of `buffer` before this have been consumed
    position: usize,
}

impl Frame {
    fn new(session: Session, input: Box<dyn Readable>) -> Self {
        Self {
            session,
            input,
            buffer: vec![],
            position: 0,
        }
    }

    fn remainder(&self) -> &[u8] {
        &self.buffer[self.position..]
    }
}

/// Drives a stack of sessions, one per file being read.
///
/// The top of the stack is the innermost include, only it makes progress.
/// When it finishes its parent continues with the bytes it had already read.
pub struct Preprocessor<'a, S: Sink> {
    sink: S,
    options: PreprocessOptions,
    search: SearchPaths,
    environment: Environment,
    diagnostics: &'a Diagnostics<'a>,
    fs: Box<dyn Fs + 'a>,
    evaluator: Box<dyn EvaluateCondition + 'a>,
    on_complete: Option<Box<dyn FnMut(Completed) + 'a>>,
    frames: Vec<Frame>,
    completion: Completion,
}

impl<'a, S: Sink> Preprocessor<'a, S> {
    pub fn new(sink: S, options: PreprocessOptions, diagnostics: &'a Diagnostics<'a>) -> Self {
        let mut environment = Environment::stdc();

        for (name, value) in options.defines.iter() {
            environment.add_predefined(name, value.as_deref());
        }

        let search = SearchPaths::new(
            options.include_dirs.clone(),
            options.default_include_dirs.clone(),
        );

        Self {
            sink,
            options,
            search,
            environment,
            diagnostics,
            fs: Box::new(BlockingFs),
            evaluator: Box::new(AssumeActive),
            on_complete: None,
            frames: vec![],
            completion: Completion::Complete,
        }
    }

    pub fn with_fs(self, fs: impl Fs + 'a) -> Self {
        Self {
            fs: Box::new(fs),
            ..self
        }
    }

    pub fn with_evaluator(self, evaluator: impl EvaluateCondition + 'a) -> Self {
        Self {
            evaluator: Box::new(evaluator),
            ..self
        }
    }

    pub fn on_complete(self, callback: impl FnMut(Completed) + 'a) -> Self {
        Self {
            on_complete: Some(Box::new(callback)),
            ..self
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn source_files(&self) -> &'a SourceFiles {
        self.diagnostics.source_files()
    }

    /// Number of sessions currently open, including suspended parents
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_idle(&self) -> bool {
        self.frames.is_empty()
    }

    /// Starts preprocessing a file, the directory containing it is used for
    /// quoted includes
    pub fn start_file(&mut self, path: impl AsRef<Path>) -> Result<(), PreprocessorError> {
        let path = path.as_ref();
        let input = self.fs.open(path, self.options.chunk_size)?;
        let key = self.source_files().add(path.to_path_buf());
        let base = self.base_directory(key);
        self.begin(key, base, input);
        Ok(())
    }

    /// Starts preprocessing an arbitrary input
    pub fn start(
        &mut self,
        input: Box<dyn Readable>,
        name: impl Into<PathBuf>,
        base: Option<PathBuf>,
    ) {
        let key = self.source_files().add(name.into());
        self.begin(key, base, input);
    }

    // Anything still in progress is cancelled first
    fn begin(&mut self, key: SourceFileKey, base: Option<PathBuf>, input: Box<dyn Readable>) {
        self.cancel();

        debug!(
            "Starting {}",
            self.source_files().get(key).filepath().display()
        );

        if self.options.strip_comments {
            self.diagnostics
                .push(WarningDiagnostic::plain("Stripping comments is not supported, ignoring"));
        }

        if self.options.strip_whitespace {
            self.diagnostics.push(WarningDiagnostic::plain(
                "Stripping whitespace is not supported, ignoring",
            ));
        }

        self.completion = Completion::Complete;
        self.frames
            .push(Frame::new(Session::new(key, base, 0), input));
    }

    fn base_directory(&self, key: SourceFileKey) -> Option<PathBuf> {
        self.source_files()
            .get(key)
            .base_directory()
            .map(Path::to_path_buf)
    }

    /// Abandons every open session, the innermost include first
    pub fn cancel(&mut self) {
        if !self.frames.is_empty() {
            debug!("Cancelling {} open session(s)", self.frames.len());
        }

        while self.frames.pop().is_some() {}
    }

    /// Makes one step of progress on the innermost session
    pub fn pump(&mut self) -> Result<Pump, PreprocessorError> {
        let Self {
            sink,
            options,
            search,
            environment,
            diagnostics,
            fs,
            evaluator,
            frames,
            ..
        } = self;

        let Some(frame) = frames.last_mut() else {
            return Ok(Pump::Finished(self.completion));
        };

        let mut ctx = Context {
            sink,
            environment,
            diagnostics: *diagnostics,
            fs: fs.as_ref(),
            search,
            evaluator: evaluator.as_ref(),
            max_include_depth: options.max_include_depth,
        };

        if frame.remainder().is_empty() {
            match frame.input.read_chunk(&mut frame.buffer)? {
                ReadStatus::Data(_) => frame.position = 0,
                ReadStatus::WouldBlock => return Ok(Pump::Waiting),
                ReadStatus::End => {
                    frame.buffer.clear();
                    frame.position = 0;

                    return match frame.session.finish(&mut ctx)? {
                        Finish::Include(request) => {
                            self.include(request);
                            Ok(Pump::Progress)
                        }
                        Finish::Done(completion) => Ok(self.complete(completion)),
                    };
                }
            }
        }

        let advance = frame.session.advance(&frame.buffer[frame.position..], &mut ctx)?;
        frame.position += advance.consumed;

        if let Some(request) = advance.include {
            self.include(request);
        }

        Ok(Pump::Progress)
    }

    /// Pumps until the outermost session completes, yielding while waiting
    pub fn run(&mut self) -> Result<Completion, PreprocessorError> {
        loop {
            match self.pump()? {
                Pump::Progress => (),
                Pump::Waiting => std::thread::yield_now(),
                Pump::Finished(completion) => return Ok(completion),
            }
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn include(&mut self, request: IncludeRequest) {
        let Some(depth) = self.frames.last().map(|parent| parent.session.depth() + 1) else {
            return;
        };

        match self.fs.open(&request.path, self.options.chunk_size) {
            Ok(input) => {
                debug!("Including {} at depth {}", request.path.display(), depth);

                let key = self.source_files().add(request.path);
                let base = self.base_directory(key);

                self.frames
                    .push(Frame::new(Session::new(key, base, depth), input));
            }
            Err(error) => {
                self.diagnostics.push(ErrorDiagnostic::new(
                    PreprocessorErrorKind::CannotOpenInclude(error.to_string()),
                    request.source,
                ));

                if let Some(parent) = self.frames.last_mut() {
                    parent.session.resume();
                }
            }
        }
    }

    fn complete(&mut self, completion: Completion) -> Pump {
        let Some(frame) = self.frames.pop() else {
            return Pump::Finished(self.completion);
        };

        let key = frame.session.key();
        let depth = frame.session.depth();
        debug!(
            "Finished {} ({:?})",
            self.source_files().get(key).filepath().display(),
            completion
        );

        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete(Completed {
                key,
                depth,
                completion,
            });
        }

        self.completion = self.completion.merge(completion);

        match self.frames.last_mut() {
            Some(parent) => {
                parent.session.resume();
                Pump::Progress
            }
            None => Pump::Finished(self.completion),
        }
    }
}
