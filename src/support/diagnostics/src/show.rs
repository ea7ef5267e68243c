use source_files::{Source, SourceFiles};
use std::path::Path;

pub trait Show {
    fn show(&self, w: &mut dyn std::fmt::Write, source_files: &SourceFiles) -> std::fmt::Result;

    fn eprintln(self: &Self, source_files: &SourceFiles) {
        let mut message = String::new();
        if self.show(&mut message, source_files).is_ok() {
            eprintln!("{}", message);
        }
    }
}

/// Filename to show for a source, relative to the working directory when possible
pub fn minimal_filename<'a>(source: Source, source_files: &'a SourceFiles) -> &'a str {
    let filename = source_files.get(source.key).filename();

    std::env::current_dir()
        .ok()
        .and_then(|cwd| {
            Path::new(filename)
                .strip_prefix(cwd)
                .ok()
                .and_then(|relative| relative.to_str())
                .filter(|relative| !relative.is_empty() && filename.ends_with(relative))
                .map(|relative| &filename[filename.len() - relative.len()..])
        })
        .unwrap_or(filename)
}
