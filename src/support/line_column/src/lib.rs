use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub const START: Self = Self { line: 1, column: 1 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn shift_column(&self, amount: u32) -> Self {
        Self {
            line: self.line,
            column: self.column + amount,
        }
    }

    // Location of the byte following `byte`
    pub fn advance(&self, byte: u8) -> Self {
        match byte {
            b'\n' => Self {
                line: self.line + 1,
                column: 1,
            },
            // Only count the first byte of each UTF-8 sequence
            0x80..=0xBF => *self,
            _ => self.shift_column(1),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::START
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[test]
fn test_advance_counts_lines_and_columns() {
    let location = b"ab\ncd"
        .iter()
        .fold(Location::START, |location, byte| location.advance(*byte));

    assert_eq!(location, Location::new(2, 3));
}

#[test]
fn test_advance_skips_utf8_continuation_bytes() {
    let location = "é!"
        .bytes()
        .fold(Location::START, |location, byte| location.advance(byte));

    assert_eq!(location, Location::new(1, 3));
}
