mod invoke;
mod parse;

use preprocess::PreprocessOptions;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct PreprocessCommand {
    pub filename: PathBuf,
    pub options: PreprocessOptions,
    /// Write here instead of stdout
    pub output: Option<PathBuf>,
    /// Print the tokens of the output instead of the output itself
    pub tokens: bool,
}
