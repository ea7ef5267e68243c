mod help;
mod process;

use enum_dispatch::enum_dispatch;
use help::HelpCommand;
use process::PreprocessCommand;

#[enum_dispatch(Invoke)]
#[derive(Clone, Debug)]
pub enum Command {
    Help(HelpCommand),
    Preprocess(PreprocessCommand),
}

impl Command {
    pub fn parse() -> Result<Self, ()> {
        Self::parse_from(std::env::args().skip(1))
    }

    pub fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self, ()> {
        let mut args = args.into_iter().peekable();

        match args.peek().map(String::as_str) {
            Some("-h" | "--help") | None => HelpCommand::parse(args).map(Self::from),
            _ => PreprocessCommand::parse(args).map(Self::from),
        }
    }
}

#[enum_dispatch]
pub trait Invoke {
    fn invoke(self) -> Result<(), ()>;
}

#[cfg(test)]
fn args(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

#[test]
fn test_help_is_the_default() {
    assert!(matches!(Command::parse_from(args(&[])), Ok(Command::Help(_))));
    assert!(matches!(
        Command::parse_from(args(&["--help"])),
        Ok(Command::Help(_))
    ));
}

#[test]
fn test_anything_else_preprocesses() {
    assert!(matches!(
        Command::parse_from(args(&["-I", "include", "main.c"])),
        Ok(Command::Preprocess(_))
    ));
}
