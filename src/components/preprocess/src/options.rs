use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct PreprocessOptions {
    // Accepted but not implemented, requesting either produces a warning
    pub strip_comments: bool,
    pub strip_whitespace: bool,

    /// Explicit include search list (`-I`), `None` uses the default list
    pub include_dirs: Option<Vec<PathBuf>>,
    pub default_include_dirs: Vec<PathBuf>,

    /// Predefined macros (`-D NAME` or `-D NAME=VALUE`)
    pub defines: Vec<(String, Option<String>)>,

    pub max_include_depth: usize,
    pub chunk_size: usize,
}

impl PreprocessOptions {
    pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 200;
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;

    pub fn add_define(&mut self, definition: &str) {
        let (name, value) = match definition.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (definition, None),
        };

        self.defines.push((name.to_string(), value));
    }

    pub fn add_include_dir(&mut self, dir: impl Into<PathBuf>) {
        self.include_dirs.get_or_insert_with(Vec::new).push(dir.into());
    }
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            strip_comments: false,
            strip_whitespace: false,
            include_dirs: None,
            default_include_dirs: vec!["/usr/local/include".into(), "/usr/include".into()],
            defines: vec![],
            max_include_depth: Self::DEFAULT_MAX_INCLUDE_DEPTH,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }
}

#[test]
fn test_add_define() {
    let mut options = PreprocessOptions::default();
    options.add_define("DEBUG");
    options.add_define("LEVEL=3");
    options.add_define("EMPTY=");

    assert_eq!(
        options.defines,
        vec![
            ("DEBUG".to_string(), None),
            ("LEVEL".to_string(), Some("3".to_string())),
            ("EMPTY".to_string(), Some("".to_string())),
        ]
    );
}
