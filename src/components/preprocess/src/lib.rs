/*
    ===========================  preprocess/src/lib.rs  ===========================
    Streaming C preprocessor

    Input arrives in chunks of any size and is processed one byte at a time.
    Directives are recognized and consumed, conditional regions are suppressed,
    adjacent string literals are merged, and everything else is copied through.
    Includes suspend the current session until the included file has been
    completely processed.
    ---------------------------------------------------------------------------
*/

mod conditional;
mod directive;
mod driver;
mod environment;
mod error;
mod fs;
mod include;
mod io;
mod options;
mod session;

pub use conditional::*;
pub use directive::*;
use diagnostics::Diagnostics;
pub use driver::*;
pub use environment::*;
pub use error::*;
pub use fs::*;
pub use include::*;
pub use io::*;
pub use options::*;
pub use session::*;
use std::path::{Path, PathBuf};

/// Preprocesses a file from disk into `sink`
pub fn preprocess_file<'a, S: Sink>(
    path: impl AsRef<Path>,
    options: PreprocessOptions,
    sink: S,
    diagnostics: &'a Diagnostics<'a>,
) -> Result<(S, Completion), PreprocessorError> {
    let mut preprocessor = Preprocessor::new(sink, options, diagnostics);
    preprocessor.start_file(path)?;
    let completion = preprocessor.run()?;
    Ok((preprocessor.into_sink(), completion))
}

/// Preprocesses in-memory content, includes are still read from disk
pub fn preprocess_bytes<'a>(
    content: &[u8],
    name: impl Into<PathBuf>,
    options: PreprocessOptions,
    diagnostics: &'a Diagnostics<'a>,
) -> Result<(Vec<u8>, Completion), PreprocessorError> {
    let input = MemoryInput::new(content, options.chunk_size);
    let mut preprocessor = Preprocessor::new(Vec::new(), options, diagnostics);
    preprocessor.start(Box::new(input), name, None);
    let completion = preprocessor.run()?;
    Ok((preprocessor.into_sink(), completion))
}

#[cfg(test)]
use diagnostics::{DiagnosticFlags, Severity};
#[cfg(test)]
use indoc::indoc;
#[cfg(test)]
use source_files::SourceFiles;

#[cfg(test)]
struct Outcome {
    output: String,
    completion: Completion,
    diagnostics: Vec<(Severity, String)>,
}

#[cfg(test)]
fn run_with(
    fs: MemoryFs,
    main: &str,
    options: PreprocessOptions,
    evaluator: impl EvaluateCondition,
) -> Outcome {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    let mut preprocessor = Preprocessor::new(Vec::new(), options, &diagnostics)
        .with_fs(fs)
        .with_evaluator(evaluator);

    preprocessor.start_file(main).unwrap();
    let completion = preprocessor.run().unwrap();
    let output = String::from_utf8(preprocessor.into_sink()).unwrap();

    Outcome {
        output,
        completion,
        diagnostics: diagnostics.collected(),
    }
}

#[cfg(test)]
fn run_chunked(content: &str, chunk_size: usize) -> Outcome {
    let options = PreprocessOptions {
        chunk_size,
        ..Default::default()
    };

    run_with(
        MemoryFs::new().with("/src/main.c", content),
        "/src/main.c",
        options,
        AssumeActive,
    )
}

#[cfg(test)]
fn preprocess(content: &str) -> String {
    let outcome = run_chunked(content, 4096);
    assert_eq!(outcome.diagnostics, vec![]);
    outcome.output
}

#[cfg(test)]
fn error(message: &str) -> (Severity, String) {
    (Severity::Error, message.to_string())
}

#[test]
fn test_plain_text_is_unchanged() {
    let content = indoc! {"
        int main(int argc, char **argv) {
            int x = 3 * (4 + 5); /* comment */
            return x > 1 ? 0 : 1; // 100% \\ plain
        }
          \ta = b;
    "};

    for chunk_size in [1, 2, 3, 7, 4096] {
        let outcome = run_chunked(content, chunk_size);
        assert_eq!(outcome.output, content, "chunk size {}", chunk_size);
        assert_eq!(outcome.completion, Completion::Complete);
    }
}

#[test]
fn test_adjacent_strings_merge() {
    assert_eq!(preprocess("s = \"abc\" \"def\";\n"), "s = \"abcdef\";\n");
    assert_eq!(preprocess("s = \"abc\"\t\t\"def\";\n"), "s = \"abcdef\";\n");
    assert_eq!(preprocess("s = \"abc\"\n  \"def\";\n"), "s = \"abcdef\";\n");
    assert_eq!(preprocess("s = \"a\" \"b\" \"c\";\n"), "s = \"abc\";\n");
    assert_eq!(preprocess("s = \"a\\\"\" \"b\";\n"), "s = \"a\\\"b\";\n");
}

#[test]
fn test_adjacent_strings_merge_across_chunks() {
    for chunk_size in [1, 2, 5] {
        let outcome = run_chunked("s = \"abc\" \n \"def\";\n", chunk_size);
        assert_eq!(outcome.output, "s = \"abcdef\";\n");

        let outcome = run_chunked("s = \"a\\\"\" \"b\";\n", chunk_size);
        assert_eq!(outcome.output, "s = \"a\\\"b\";\n", "chunk size {}", chunk_size);
    }
}

#[test]
fn test_lone_string_keeps_following_whitespace() {
    assert_eq!(preprocess("f(\"abc\" , 1);\n"), "f(\"abc\" , 1);\n");
    assert_eq!(preprocess("s = \"abc\"\n;\n"), "s = \"abc\"\n;\n");
    assert_eq!(preprocess("s = \"abc\"  \n"), "s = \"abc\"  \n");
    assert_eq!(preprocess("s = \"abc\"\n#define X\nx\n"), "s = \"abc\"\nx\n");
}

#[test]
fn test_character_constants_do_not_open_strings() {
    let content = "c = '\"'; q = '\\''; s = \"x\";\n";
    assert_eq!(preprocess(content), content);
}

#[cfg(test)]
#[test_log::test]
fn test_directives_match_across_chunk_sizes() {
    let content = indoc! {r#"
        #define A 1
        #undef A
        #ifdef A
        a
        #elif B
        b
        #else
        c
        #endif
        #if X
        x
        #endif
        #ifndef Y
        y
        #endif
        #include "inc.h"
        end
    "#};

    let expected = "a\nx\ny\nincluded\nend\n";

    for chunk_size in [1, 2, 3, 4096] {
        let options = PreprocessOptions {
            chunk_size,
            ..Default::default()
        };

        let fs = MemoryFs::new()
            .with("/src/main.c", content)
            .with("/src/inc.h", "included\n");

        let outcome = run_with(fs, "/src/main.c", options, AssumeActive);
        assert_eq!(outcome.output, expected, "chunk size {}", chunk_size);
        assert_eq!(outcome.diagnostics, vec![]);
    }
}

#[test]
fn test_unknown_directives_pass_through() {
    for content in [
        "#pragma once\nint x;\n",
        "#pragma   once\n",
        "#  pragma once\n",
        "  #pragma once\n",
        "#error  stop  here\n",
        "#line 10\n",
        "#ifx\n",
        "#elsewhere\n",
        "#\n",
        "#pragma once",
    ] {
        for chunk_size in [1, 4096] {
            let outcome = run_chunked(content, chunk_size);
            assert_eq!(outcome.output, content);
            assert_eq!(outcome.diagnostics, vec![]);
        }
    }
}

#[test]
fn test_indented_directives_are_consumed() {
    assert_eq!(preprocess("  #define X 1\n\t# define Y\nz\n"), "z\n");
}

#[test]
fn test_vertical_whitespace_around_hash() {
    let content = "#\x0Bdefine X 1\n\x0C#\x0Cdefine Y\n\x0B#undef X\nx\n";

    for chunk_size in [1, 4096] {
        let outcome = run_chunked(content, chunk_size);
        assert_eq!(outcome.output, "x\n", "chunk size {}", chunk_size);
        assert_eq!(outcome.diagnostics, vec![]);
    }
}

#[test]
fn test_hash_inside_line_is_text() {
    assert_eq!(preprocess("a # b\nx = \"#if\";\n"), "a # b\nx = \"#if\";\n");
}

#[test]
fn test_else_flips_outer_block() {
    let content = indoc! {"
        #if A
        #if B
        inner
        #endif
        outer
        #else
        alternative
        #endif
        after
    "};

    assert_eq!(preprocess(content), "inner\nouter\nafter\n");
}

#[test]
fn test_elif_chain_skips_after_taken_branch() {
    let content = indoc! {"
        #if A
        first
        #elif B
        second
        #elif C
        third
        #else
        fourth
        #endif
    "};

    assert_eq!(preprocess(content), "first\n");
}

#[test]
fn test_include_resolution_order() {
    let fs = MemoryFs::new()
        .with("/X/main.c", "#include \"f.h\"\n#include <f.h>\n")
        .with("/X/f.h", "from X\n")
        .with("/A/f.h", "from A\n")
        .with("/D/f.h", "from D\n");

    let options = PreprocessOptions {
        include_dirs: Some(vec!["/A".into(), "/B".into()]),
        default_include_dirs: vec!["/D".into()],
        ..Default::default()
    };

    let outcome = run_with(fs, "/X/main.c", options, AssumeActive);
    assert_eq!(outcome.output, "from X\nfrom A\n");
    assert_eq!(outcome.diagnostics, vec![]);
}

#[test]
fn test_include_remainder_is_replayed() {
    for chunk_size in [1, 4, 4096] {
        let fs = MemoryFs::new()
            .with("/p/main.c", "before\n#include \"a.h\"\nafter \"x\"\n")
            .with("/p/a.h", "#include \"b.h\"\nmiddle\n")
            .with("/p/b.h", "inner\n");

        let options = PreprocessOptions {
            chunk_size,
            ..Default::default()
        };

        let outcome = run_with(fs, "/p/main.c", options, AssumeActive);
        assert_eq!(outcome.output, "before\ninner\nmiddle\nafter \"x\"\n");
    }
}

#[test]
fn test_include_on_last_line_without_newline() {
    let fs = MemoryFs::new()
        .with("/p/main.c", "x\n#include \"a.h\"")
        .with("/p/a.h", "y\n");

    let outcome = run_with(fs, "/p/main.c", PreprocessOptions::default(), AssumeActive);
    assert_eq!(outcome.output, "x\ny\n");
}

#[test]
fn test_included_file_uses_own_directory() {
    let fs = MemoryFs::new()
        .with("/p/main.c", "#include \"sub/a.h\"\n")
        .with("/p/sub/a.h", "#include \"b.h\"\n")
        .with("/p/sub/b.h", "found\n")
        .with("/p/b.h", "wrong\n");

    let outcome = run_with(fs, "/p/main.c", PreprocessOptions::default(), AssumeActive);
    assert_eq!(outcome.output, "found\n");
}

#[test]
fn test_unresolvable_include_is_reported() {
    let outcome = run_chunked("#include <missing.h>\nrest\n", 4096);

    assert_eq!(outcome.output, "rest\n");
    assert_eq!(
        outcome.diagnostics,
        vec![error("Cannot find include file 'missing.h'")]
    );
}

#[test]
fn test_malformed_include_is_reported() {
    let outcome = run_chunked("#include missing.h\nrest\n", 4096);

    assert_eq!(outcome.output, "rest\n");
    assert_eq!(
        outcome.diagnostics,
        vec![error("Expected \"FILENAME\" or <FILENAME> after #include")]
    );
}

#[test]
fn test_skipped_include_is_not_resolved() {
    let content = "#if A\n#else\n#include <missing.h>\n#endif\nok\n";
    assert_eq!(preprocess(content), "ok\n");
}

#[test]
fn test_include_depth_is_limited() {
    let fs = MemoryFs::new()
        .with("/r/main.c", "#include \"self.h\"\n")
        .with("/r/self.h", "#include \"self.h\"\nx\n");

    let options = PreprocessOptions {
        max_include_depth: 3,
        ..Default::default()
    };

    let outcome = run_with(fs, "/r/main.c", options, AssumeActive);
    assert_eq!(outcome.output, "x\nx\nx\n");
    assert_eq!(
        outcome.diagnostics,
        vec![error("#include nested more than 3 levels deep")]
    );
}

#[test]
fn test_unbalanced_conditionals_are_reported() {
    let outcome = run_chunked("#endif\ntext\n#else\n", 4096);
    assert_eq!(outcome.output, "text\n");
    assert_eq!(
        outcome.diagnostics,
        vec![error("#endif without #if"), error("#else without #if")]
    );

    let outcome = run_chunked("#if A\nx\n#ifdef B\n", 4096);
    assert_eq!(outcome.output, "x\n");
    assert_eq!(
        outcome.diagnostics,
        vec![
            error("Unterminated conditional directive"),
            error("Unterminated conditional directive")
        ]
    );
}

#[test]
fn test_include_guard() {
    let fs = MemoryFs::new()
        .with("/g/main.c", "#include \"g.h\"\n#include \"g.h\"\n")
        .with("/g/g.h", "#ifndef G_H\n#define G_H\nguarded\n#endif\n");

    let guarded = run_with(fs.clone(), "/g/main.c", PreprocessOptions::default(), CheckDefined);
    assert_eq!(guarded.output, "guarded\n");

    let assumed = run_with(fs, "/g/main.c", PreprocessOptions::default(), AssumeActive);
    assert_eq!(assumed.output, "guarded\nguarded\n");
}

#[test]
fn test_predefined_macros() {
    let mut options = PreprocessOptions::default();
    options.add_define("DEBUG");

    let fs = MemoryFs::new().with(
        "/m/main.c",
        "#ifdef DEBUG\nd\n#endif\n#ifdef __STDC__\ns\n#endif\n#ifdef OTHER\no\n#endif\n",
    );

    let outcome = run_with(fs, "/m/main.c", options, CheckDefined);
    assert_eq!(outcome.output, "d\ns\n");
}

#[test]
fn test_defines_are_recorded() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    let fs = MemoryFs::new().with(
        "/d/main.c",
        "#define LONG 1 \\\n  2\n#define F(a, b) a + b\n#define GONE\n#undef GONE\nx\n",
    );

    let mut preprocessor = Preprocessor::new(Vec::new(), PreprocessOptions::default(), &diagnostics)
        .with_fs(fs);

    preprocessor.start_file("/d/main.c").unwrap();
    preprocessor.run().unwrap();

    let environment = preprocessor.environment();
    assert_eq!(environment.find_define("LONG").unwrap().replacement, ["1", "2"]);

    let function = environment.find_define("F").unwrap();
    assert_eq!(
        function.parameters,
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(function.replacement, ["a", "+", "b"]);
    assert!(!environment.is_defined("GONE"));

    assert_eq!(preprocessor.sink(), b"x\n");
    assert!(!diagnostics.has_errors());
}

#[test]
fn test_truncated_string() {
    let outcome = run_chunked("s = \"abc", 2);

    assert_eq!(outcome.output, "s = \"abc");
    assert_eq!(
        outcome.completion,
        Completion::Truncated(Truncation::StringLiteral)
    );
    assert_eq!(
        outcome.diagnostics,
        vec![(Severity::Warning, "Unterminated string literal".to_string())]
    );
}

#[test]
fn test_string_at_end_of_input() {
    let outcome = run_chunked("s = \"abc\"  ", 4096);

    assert_eq!(outcome.output, "s = \"abc\"  ");
    assert_eq!(outcome.completion, Completion::Complete);
}

#[test]
fn test_stalling_input() {
    let fs = MemoryFs::new()
        .with("/s/main.c", "a \"b\"\n#include \"c.h\"\nd\n")
        .with("/s/c.h", "c\n")
        .stalling();

    let options = PreprocessOptions {
        chunk_size: 3,
        ..Default::default()
    };

    let outcome = run_with(fs, "/s/main.c", options, AssumeActive);
    assert_eq!(outcome.output, "a \"b\"\nc\nd\n");
}

#[test]
fn test_waiting_is_reported() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());
    let mut preprocessor = Preprocessor::new(Vec::new(), PreprocessOptions::default(), &diagnostics);

    preprocessor.start(
        Box::new(MemoryInput::new(&b"abc"[..], 2).stalling()),
        "<stalling>",
        None,
    );

    assert_eq!(preprocessor.pump().unwrap(), Pump::Waiting);
    assert_eq!(preprocessor.pump().unwrap(), Pump::Progress);
    assert_eq!(preprocessor.sink(), b"ab");
    assert_eq!(preprocessor.run().unwrap(), Completion::Complete);
    assert_eq!(preprocessor.sink(), b"abc");
}

#[cfg(test)]
#[test_log::test]
fn test_completion_order() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());
    let mut completed = Vec::new();

    let fs = MemoryFs::new()
        .with("/o/main.c", "#include \"a.h\"\n")
        .with("/o/a.h", "#include \"b.h\"\n")
        .with("/o/b.h", "b\n");

    let mut preprocessor = Preprocessor::new(Vec::new(), PreprocessOptions::default(), &diagnostics)
        .with_fs(fs)
        .on_complete(|done| completed.push((done.key, done.depth)));

    preprocessor.start_file("/o/main.c").unwrap();
    preprocessor.run().unwrap();
    drop(preprocessor);

    let names = completed
        .iter()
        .map(|(key, depth)| (source_files.get(*key).filename().to_string(), *depth))
        .collect::<Vec<_>>();

    assert_eq!(
        names,
        vec![
            ("/o/b.h".to_string(), 2),
            ("/o/a.h".to_string(), 1),
            ("/o/main.c".to_string(), 0),
        ]
    );
}

#[test]
fn test_cancel() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    let fs = MemoryFs::new()
        .with("/c/main.c", "#include \"a.h\"\nafter\n")
        .with("/c/a.h", "a\n");

    let options = PreprocessOptions {
        chunk_size: 1,
        ..Default::default()
    };

    let mut preprocessor = Preprocessor::new(Vec::new(), options, &diagnostics).with_fs(fs);
    preprocessor.start_file("/c/main.c").unwrap();

    while preprocessor.depth() < 2 {
        assert_eq!(preprocessor.pump().unwrap(), Pump::Progress);
    }

    preprocessor.cancel();
    assert!(preprocessor.is_idle());
    assert_eq!(
        preprocessor.pump().unwrap(),
        Pump::Finished(Completion::Complete)
    );
}

#[test]
fn test_strip_options_warn() {
    let options = PreprocessOptions {
        strip_comments: true,
        strip_whitespace: true,
        ..Default::default()
    };

    let fs = MemoryFs::new().with("/w/main.c", "/* kept */ x\n");
    let outcome = run_with(fs, "/w/main.c", options, AssumeActive);

    assert_eq!(outcome.output, "/* kept */ x\n");
    assert_eq!(
        outcome
            .diagnostics
            .iter()
            .filter(|(severity, _)| severity.is_warning())
            .count(),
        2
    );
}

#[test]
fn test_preprocess_bytes() {
    let source_files = SourceFiles::new();
    let diagnostics = Diagnostics::new(&source_files, DiagnosticFlags::collect());

    let (output, completion) = preprocess_bytes(
        b"#define X\n\"a\" \"b\"\n",
        "<memory>",
        PreprocessOptions::default(),
        &diagnostics,
    )
    .unwrap();

    assert_eq!(output, b"\"ab\"\n");
    assert_eq!(completion, Completion::Complete);
}
