use super::PreprocessCommand;
use preprocess::PreprocessOptions;
use std::path::PathBuf;

impl PreprocessCommand {
    pub fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ()> {
        let mut filename = None;
        let mut options = PreprocessOptions::default();
        let mut output = None;
        let mut tokens = false;

        while let Some(option) = args.next() {
            match option.as_str() {
                "--strip-comments" => options.strip_comments = true,
                "--strip-whitespace" => options.strip_whitespace = true,
                "--tokens" => tokens = true,
                "-I" => options.add_include_dir(expect_value(&mut args, "-I")?),
                "-D" => options.add_define(&expect_value(&mut args, "-D")?),
                "-o" => output = Some(PathBuf::from(expect_value(&mut args, "-o")?)),
                "--max-include-depth" => {
                    let value = expect_value(&mut args, "--max-include-depth")?;

                    let Ok(depth) = value.parse() else {
                        eprintln!("error: Invalid include depth '{}'", value);
                        return Err(());
                    };

                    options.max_include_depth = depth;
                }
                _ if option.starts_with("-I") && option.len() > 2 => {
                    options.add_include_dir(&option[2..]);
                }
                _ if option.starts_with("-D") && option.len() > 2 => {
                    options.add_define(&option[2..]);
                }
                _ if option.starts_with('-') && option.len() > 1 => {
                    eprintln!("error: Unknown option '{}'", option);
                    return Err(());
                }
                _ => {
                    if filename.replace(PathBuf::from(option)).is_some() {
                        eprintln!("error: Multiple filenames specified");
                        return Err(());
                    }
                }
            }
        }

        let Some(filename) = filename else {
            eprintln!("error: No filename specified");
            return Err(());
        };

        Ok(Self {
            filename,
            options,
            output,
            tokens,
        })
    }
}

fn expect_value(args: &mut impl Iterator<Item = String>, option: &str) -> Result<String, ()> {
    args.next().ok_or_else(|| {
        eprintln!("error: Expected value after '{}'", option);
    })
}

#[cfg(test)]
fn parse(args: &[&str]) -> Result<PreprocessCommand, ()> {
    PreprocessCommand::parse(args.iter().map(|arg| arg.to_string()))
}

#[test]
fn test_parse_options() {
    let command = parse(&[
        "-I",
        "include",
        "-Ivendor",
        "-D",
        "DEBUG",
        "-DLEVEL=2",
        "--max-include-depth",
        "16",
        "--tokens",
        "-o",
        "out.i",
        "main.c",
    ])
    .unwrap();

    assert_eq!(command.filename, PathBuf::from("main.c"));
    assert_eq!(command.output, Some(PathBuf::from("out.i")));
    assert!(command.tokens);
    assert_eq!(
        command.options.include_dirs,
        Some(vec![PathBuf::from("include"), PathBuf::from("vendor")])
    );
    assert_eq!(
        command.options.defines,
        [
            ("DEBUG".to_string(), None),
            ("LEVEL".to_string(), Some("2".to_string()))
        ]
    );
    assert_eq!(command.options.max_include_depth, 16);
}

#[test]
fn test_defaults() {
    let command = parse(&["main.c"]).unwrap();

    assert_eq!(command.options.include_dirs, None);
    assert_eq!(
        command.options.max_include_depth,
        PreprocessOptions::DEFAULT_MAX_INCLUDE_DEPTH
    );
    assert_eq!(command.output, None);
    assert!(!command.tokens);
}

#[test]
fn test_rejects_bad_arguments() {
    assert!(parse(&[]).is_err());
    assert!(parse(&["a.c", "b.c"]).is_err());
    assert!(parse(&["main.c", "-I"]).is_err());
    assert!(parse(&["--max-include-depth", "deep", "main.c"]).is_err());
    assert!(parse(&["--frobnicate", "main.c"]).is_err());
}
