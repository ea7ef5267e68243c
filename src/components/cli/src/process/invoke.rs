use super::PreprocessCommand;
use crate::Invoke;
use build_token::{FeedResult, LexResult, Lexer};
use diagnostics::{DiagnosticFlags, Diagnostics, ErrorDiagnostic, Show, WarningDiagnostic};
use intern_token::TokenStore;
use log::info;
use preprocess::{PreprocessOptions, Sink, preprocess_file};
use source_files::SourceFiles;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

impl Invoke for PreprocessCommand {
    fn invoke(self) -> Result<(), ()> {
        let PreprocessCommand {
            filename,
            options,
            output,
            tokens,
        } = self;

        let source_files = SourceFiles::new();
        let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

        if tokens {
            let preprocessed = preprocess_into(&filename, options, Vec::new(), &diagnostics)?;
            let listing = list_tokens(&preprocessed, &diagnostics);

            let written = match &output {
                Some(output) => std::fs::write(output, listing),
                None => std::io::stdout().lock().write_all(listing.as_bytes()),
            };

            written.map_err(|error| {
                eprintln!("error: Failed to write output - {}", error);
            })?;
        } else {
            match &output {
                Some(output) => {
                    let file = File::create(output).map_err(|error| {
                        eprintln!("error: Failed to create '{}' - {}", output.display(), error);
                    })?;

                    preprocess_into(&filename, options, BufWriter::new(file), &diagnostics)?;
                }
                None => {
                    preprocess_into(&filename, options, std::io::stdout().lock(), &diagnostics)?;
                }
            }
        }

        diagnostics.print_all();

        if diagnostics.has_errors() {
            Err(())
        } else {
            Ok(())
        }
    }
}

/// Streams the preprocessed file into `sink` as it is produced
fn preprocess_into<'a, S: Sink>(
    filename: &Path,
    options: PreprocessOptions,
    sink: S,
    diagnostics: &'a Diagnostics<'a>,
) -> Result<S, ()> {
    let (sink, completion) =
        preprocess_file(filename, options, sink, diagnostics).map_err(|error| {
            diagnostics.print_all();
            error.eprintln(diagnostics.source_files());
        })?;

    info!("Preprocessed {} ({:?})", filename.display(), completion);
    Ok(sink)
}

/// One interned token per line
fn list_tokens(preprocessed: &[u8], diagnostics: &Diagnostics) -> String {
    let store = TokenStore::new();
    let mut lexer = Lexer::new(&store);
    let mut listing = String::new();

    lexer.push(preprocessed);
    lexer.end();

    loop {
        match lexer.next() {
            FeedResult::Has(LexResult::Token(token)) => {
                listing.push_str(&token.to_string());
                listing.push('\n');
            }
            FeedResult::Has(LexResult::Invalid { offset }) => {
                diagnostics.push(ErrorDiagnostic::plain(format!(
                    "Invalid token at byte {} of preprocessed output",
                    offset
                )));
            }
            FeedResult::Has(LexResult::Incomplete) => {
                diagnostics.push(WarningDiagnostic::plain(
                    "Preprocessed output ends inside a comment or literal",
                ));
                break;
            }
            FeedResult::Has(LexResult::EndOfFile) | FeedResult::Waiting => break,
        }
    }

    listing
}

#[test]
fn test_list_tokens() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    assert_eq!(
        list_tokens(b"return x @ 1;", &diagnostics),
        "keyword 'return'\nidentifier \"x\"\ninteger 1\n';'\n"
    );
    assert_eq!(diagnostics.count(diagnostics::Severity::Error), 1);
}

#[cfg(test)]
#[derive(Default)]
struct RecordingSink {
    written: Vec<u8>,
    commits: usize,
}

#[cfg(test)]
impl Sink for RecordingSink {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn commit(&mut self) -> std::io::Result<()> {
        self.commits += 1;
        Ok(())
    }
}

#[test]
fn test_output_is_streamed_into_the_sink() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    let options = PreprocessOptions {
        chunk_size: 64,
        ..Default::default()
    };

    // The manifest has no directives, so it passes through unchanged
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
    let sink = preprocess_into(&path, options, RecordingSink::default(), &diagnostics).unwrap();

    assert_eq!(sink.written, std::fs::read(&path).unwrap());
    assert!(sink.commits > 1);
    assert!(!diagnostics.has_errors());
}
