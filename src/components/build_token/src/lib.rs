/*
    ===================  components/build_token/src/lib.rs  ===================
    Turns preprocessed C source into interned tokens.

    Input arrives in arbitrary chunks, a token is only produced once the
    bytes after it prove that it cannot grow any further.
    ---------------------------------------------------------------------------
*/

mod escape;
mod number;
mod scan;

use intern_token::{TokenRef, TokenStore};
use log::trace;
use scan::{Scanned, scan};
use std::fmt::Display;
use token::{Payload, TokenFlags, TokenKind};

pub enum FeedResult<T> {
    Has(T),
    Waiting,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LexResult<'s> {
    Token(TokenRef<'s>),
    EndOfFile,
    /// Byte at this offset from the start of the input cannot begin a token
    Invalid {
        offset: usize,
    },
    /// Input ended inside a comment or literal
    Incomplete,
}

/// Token contents before interning
#[derive(Clone, Debug, PartialEq)]
pub struct Lexeme {
    pub kind: TokenKind,
    pub flags: TokenFlags,
    pub payload: Option<Payload>,
}

impl Lexeme {
    pub fn new(kind: TokenKind, flags: TokenFlags, payload: Option<Payload>) -> Self {
        Self {
            kind,
            flags,
            payload,
        }
    }
}

pub struct Lexer<'s> {
    store: &'s TokenStore,
    buffer: Vec<u8>,
    position: usize,
    /// Bytes dropped from the front of `buffer` so far
    consumed: usize,
    ended: bool,
}

impl<'s> Lexer<'s> {
    pub fn new(store: &'s TokenStore) -> Self {
        Self {
            store,
            buffer: vec![],
            position: 0,
            consumed: 0,
            ended: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        debug_assert!(!self.ended, "pushed input after the end");

        self.buffer.drain(..self.position);
        self.consumed += self.position;
        self.position = 0;
        self.buffer.extend_from_slice(chunk);
    }

    /// No more input will be pushed
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn next(&mut self) -> FeedResult<LexResult<'s>> {
        loop {
            let rest = &self.buffer[self.position..];

            if rest.is_empty() {
                return if self.ended {
                    FeedResult::Has(LexResult::EndOfFile)
                } else {
                    FeedResult::Waiting
                };
            }

            match scan(rest, self.ended) {
                Scanned::Skip(len) => self.position += len,
                Scanned::Token(len, lexeme) => {
                    self.position += len;

                    let token = self.store.intern(
                        lexeme.kind,
                        lexeme.flags,
                        [lexeme.payload, None, None],
                        None,
                    );

                    trace!("lexed {}", token);
                    return FeedResult::Has(LexResult::Token(token));
                }
                Scanned::NeedMore => return FeedResult::Waiting,
                Scanned::Truncated => {
                    self.position = self.buffer.len();
                    return FeedResult::Has(LexResult::Incomplete);
                }
                Scanned::Invalid => {
                    let offset = self.consumed + self.position;
                    self.position += 1;
                    return FeedResult::Has(LexResult::Invalid { offset });
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    Invalid { offset: usize },
    Incomplete,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Invalid { offset } => write!(f, "Invalid token at byte {}", offset),
            ParseError::Incomplete => write!(f, "Unexpected end of input"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Lexes all of `bytes` into a linked chain of tokens, `None` when there are
/// no tokens at all
pub fn parse<'s>(store: &'s TokenStore, bytes: &[u8]) -> Result<Option<TokenRef<'s>>, ParseError> {
    let mut lexer = Lexer::new(store);
    lexer.push(bytes);
    lexer.end();

    let mut tokens = vec![];

    loop {
        match lexer.next() {
            FeedResult::Has(LexResult::Token(token)) => tokens.push(token),
            FeedResult::Has(LexResult::EndOfFile) => break,
            FeedResult::Has(LexResult::Invalid { offset }) => {
                return Err(ParseError::Invalid { offset });
            }
            FeedResult::Has(LexResult::Incomplete) | FeedResult::Waiting => {
                return Err(ParseError::Incomplete);
            }
        }
    }

    // Linking starts from the tail, every token refers to an existing next
    Ok(tokens
        .into_iter()
        .rev()
        .fold(None, |next, token| Some(store.relink(token, next))))
}

#[cfg(test)]
fn lex_all(lexer: &mut Lexer<'_>, into: &mut Vec<String>) -> bool {
    loop {
        match lexer.next() {
            FeedResult::Has(LexResult::Token(token)) => into.push(token.to_string()),
            FeedResult::Has(LexResult::EndOfFile) => return true,
            FeedResult::Has(other) => into.push(format!("{:?}", other)),
            FeedResult::Waiting => return false,
        }
    }
}

#[cfg(test)]
fn lex(input: &str) -> Vec<String> {
    let store = TokenStore::new();
    let mut lexer = Lexer::new(&store);
    let mut tokens = vec![];

    lexer.push(input.as_bytes());
    lexer.end();
    assert!(lex_all(&mut lexer, &mut tokens));
    tokens
}

#[test]
fn test_declaration() {
    assert_eq!(
        lex("int x = 0x1Fu;"),
        [
            "keyword 'int'",
            "identifier \"x\"",
            "'='",
            "integer 31",
            "';'"
        ]
    );
}

#[test]
fn test_comments_and_whitespace_are_skipped() {
    assert_eq!(
        lex("a /* b */ // c\n\t+= 1.5"),
        ["identifier \"a\"", "'+='", "floating point 1.5"]
    );
}

#[test]
fn test_literals() {
    assert_eq!(
        lex(r#"puts("hi\n", 'A');"#),
        [
            "identifier \"puts\"",
            "'('",
            "string \"hi\\n\"",
            "','",
            "character 65",
            "')'",
            "';'"
        ]
    );
}

#[test]
fn test_chunked_input_matches_whole_input() {
    let source = "unsigned long n = 0777UL >>= 2; /* done */ return n...x;";
    let whole = lex(source);

    let store = TokenStore::new();
    let mut lexer = Lexer::new(&store);
    let mut tokens = vec![];

    for byte in source.as_bytes() {
        lexer.push(std::slice::from_ref(byte));
        assert!(!lex_all(&mut lexer, &mut tokens));
    }

    lexer.end();
    assert!(lex_all(&mut lexer, &mut tokens));
    assert_eq!(tokens, whole);
}

#[test]
fn test_invalid_bytes_are_reported_and_skipped() {
    assert_eq!(
        lex("a @ b"),
        ["identifier \"a\"", "Invalid { offset: 2 }", "identifier \"b\""]
    );
}

#[test]
fn test_invalid_offset_counts_consumed_chunks() {
    let store = TokenStore::new();
    let mut lexer = Lexer::new(&store);
    let mut tokens = vec![];

    lexer.push(b"abc ");
    lex_all(&mut lexer, &mut tokens);
    lexer.push(b"$");
    lexer.end();
    lex_all(&mut lexer, &mut tokens);

    assert_eq!(tokens, ["identifier \"abc\"", "Invalid { offset: 4 }"]);
}

#[test]
fn test_unterminated_input() {
    assert_eq!(lex("x /* never closed"), ["identifier \"x\"", "Incomplete"]);
    assert_eq!(lex("\"never closed"), ["Incomplete"]);
}

#[test]
fn test_parse_links_tokens() {
    use itertools::Itertools;

    let store = TokenStore::new();
    let head = parse(&store, b"return 0;").unwrap().unwrap();

    assert_eq!(
        head.chain().map(|token| token.kind()).collect_vec(),
        [
            TokenKind::ReturnKeyword,
            TokenKind::Integer,
            TokenKind::EndOfExpression
        ]
    );
}

#[test]
fn test_parse_shares_identical_chains() {
    let store = TokenStore::new();
    let first = parse(&store, b"x + 1").unwrap();
    let second = parse(&store, b"x  +\n1").unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(parse(&store, b"  // nothing").unwrap(), None);
}

#[test]
fn test_parse_errors() {
    let store = TokenStore::new();

    assert_eq!(parse(&store, b"a ` b"), Err(ParseError::Invalid { offset: 2 }));
    assert_eq!(parse(&store, b"'a"), Err(ParseError::Incomplete));
}
