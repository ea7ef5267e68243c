use cli::{Command, Invoke};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let Ok(command) = Command::parse() else {
        return ExitCode::FAILURE;
    };

    match command.invoke() {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}
