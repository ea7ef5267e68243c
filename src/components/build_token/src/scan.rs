use crate::{Lexeme, escape::unescape, number::parse_number};
use token::{Payload, TokenFlags, TokenKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Scanned {
    /// Whitespace or a comment of this many bytes
    Skip(usize),
    Token(usize, Lexeme),
    /// The bytes so far could still become something else
    NeedMore,
    /// Input ended inside a comment or literal
    Truncated,
    Invalid,
}

fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_identifier_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0B' | b'\x0C')
}

/// Scans the token at the start of `rest`.
///
/// When `at_end` is false more bytes may follow, so anything touching the end
/// of `rest` asks for more instead of being cut short.
pub fn scan(rest: &[u8], at_end: bool) -> Scanned {
    let Some(&first) = rest.first() else {
        return if at_end {
            Scanned::Truncated
        } else {
            Scanned::NeedMore
        };
    };

    let second = rest.get(1).copied();

    if is_whitespace(first) {
        return Scanned::Skip(rest.iter().take_while(|byte| is_whitespace(**byte)).count());
    }

    if first == b'/' {
        match second {
            Some(b'*') => return scan_block_comment(rest, at_end),
            Some(b'/') => return scan_line_comment(rest, at_end),
            None if !at_end => return Scanned::NeedMore,
            _ => (),
        }
    }

    if is_identifier_start(first) {
        return scan_identifier(rest, at_end);
    }

    if first.is_ascii_digit() || (first == b'.' && second.is_some_and(|byte| byte.is_ascii_digit())) {
        return scan_number(rest, at_end);
    }

    match first {
        b'"' => scan_quoted(rest, at_end, b'"'),
        b'\'' => scan_quoted(rest, at_end, b'\''),
        _ => scan_punctuator(rest, at_end),
    }
}

fn scan_block_comment(rest: &[u8], at_end: bool) -> Scanned {
    match rest[2..].windows(2).position(|window| window == b"*/") {
        Some(position) => Scanned::Skip(position + 4),
        None if at_end => Scanned::Truncated,
        None => Scanned::NeedMore,
    }
}

fn scan_line_comment(rest: &[u8], at_end: bool) -> Scanned {
    match rest.iter().position(|byte| *byte == b'\n') {
        Some(position) => Scanned::Skip(position),
        None if at_end => Scanned::Skip(rest.len()),
        None => Scanned::NeedMore,
    }
}

fn scan_identifier(rest: &[u8], at_end: bool) -> Scanned {
    let len = rest
        .iter()
        .take_while(|byte| is_identifier_continue(**byte))
        .count();

    if len == rest.len() && !at_end {
        return Scanned::NeedMore;
    }

    let Ok(name) = std::str::from_utf8(&rest[..len]) else {
        return Scanned::Invalid;
    };

    let lexeme = match TokenKind::keyword(name) {
        Some(keyword) => Lexeme::new(keyword, TokenFlags::empty(), None),
        None => Lexeme::new(
            TokenKind::Identifier,
            TokenFlags::empty(),
            Some(Payload::text(name)),
        ),
    };

    Scanned::Token(len, lexeme)
}

fn scan_number(rest: &[u8], at_end: bool) -> Scanned {
    let mut len = 0;

    while let Some(&byte) = rest.get(len) {
        let exponent_sign = matches!(byte, b'+' | b'-')
            && len > 0
            && matches!(rest[len - 1], b'e' | b'E' | b'p' | b'P');

        if !(is_identifier_continue(byte) || byte == b'.' || exponent_sign) {
            break;
        }

        len += 1;
    }

    if len == rest.len() && !at_end {
        return Scanned::NeedMore;
    }

    std::str::from_utf8(&rest[..len])
        .ok()
        .and_then(parse_number)
        .map_or(Scanned::Invalid, |lexeme| Scanned::Token(len, lexeme))
}

fn scan_quoted(rest: &[u8], at_end: bool, quote: u8) -> Scanned {
    let mut escape = false;

    for (i, byte) in rest.iter().copied().enumerate().skip(1) {
        if escape {
            escape = false;
            continue;
        }

        match byte {
            b'\\' => escape = true,
            b'\n' => return Scanned::Invalid,
            _ if byte == quote => {
                let Some(body) = unescape(&rest[1..i]) else {
                    return Scanned::Invalid;
                };

                return quoted_lexeme(&body, quote)
                    .map_or(Scanned::Invalid, |lexeme| Scanned::Token(i + 1, lexeme));
            }
            _ => (),
        }
    }

    if at_end {
        Scanned::Truncated
    } else {
        Scanned::NeedMore
    }
}

fn quoted_lexeme(body: &[u8], quote: u8) -> Option<Lexeme> {
    if quote == b'"' {
        return Some(Lexeme::new(
            TokenKind::String,
            TokenFlags::empty(),
            Some(Payload::text(String::from_utf8_lossy(body))),
        ));
    }

    // Multi-character constants pack their bytes, first byte highest
    if body.is_empty() || body.len() > 8 {
        return None;
    }

    let value = body
        .iter()
        .fold(0u64, |value, byte| value << 8 | u64::from(*byte));

    Some(Lexeme::new(
        TokenKind::Character,
        TokenFlags::empty(),
        Some(Payload::Unsigned(value)),
    ))
}

fn scan_punctuator(rest: &[u8], at_end: bool) -> Scanned {
    let could_grow = TokenKind::PUNCTUATORS
        .iter()
        .any(|(spelling, _)| spelling.len() > rest.len() && spelling.as_bytes().starts_with(rest));

    if could_grow && !at_end {
        return Scanned::NeedMore;
    }

    TokenKind::PUNCTUATORS
        .iter()
        .find(|(spelling, _)| rest.starts_with(spelling.as_bytes()))
        .map_or(Scanned::Invalid, |(spelling, kind)| {
            Scanned::Token(spelling.len(), Lexeme::new(*kind, TokenFlags::empty(), None))
        })
}

#[test]
fn test_scan_waits_at_chunk_end() {
    assert_eq!(scan(b"abc", false), Scanned::NeedMore);
    assert_eq!(scan(b"12", false), Scanned::NeedMore);
    assert_eq!(scan(b"<<", false), Scanned::NeedMore);
    assert_eq!(scan(b"/", false), Scanned::NeedMore);
    assert_eq!(scan(b"\"abc", false), Scanned::NeedMore);
    assert_eq!(scan(b"/* abc", false), Scanned::NeedMore);
    assert_eq!(scan(b"..", false), Scanned::NeedMore);
}

#[test]
fn test_scan_at_end() {
    assert_eq!(
        scan(b"abc", true),
        Scanned::Token(
            3,
            Lexeme::new(TokenKind::Identifier, TokenFlags::empty(), Some(Payload::text("abc")))
        )
    );
    assert_eq!(
        scan(b"<<", true),
        Scanned::Token(2, Lexeme::new(TokenKind::ShiftLeft, TokenFlags::empty(), None))
    );
    assert_eq!(scan(b"\"abc", true), Scanned::Truncated);
    assert_eq!(scan(b"/* abc", true), Scanned::Truncated);
    assert_eq!(scan(b"// abc", true), Scanned::Skip(6));
}

#[test]
fn test_scan_skips() {
    assert_eq!(scan(b" \t\n x", false), Scanned::Skip(4));
    assert_eq!(scan(b"/* a */x", false), Scanned::Skip(7));
    assert_eq!(scan(b"// a\nx", false), Scanned::Skip(4));
}

#[test]
fn test_scan_invalid() {
    assert_eq!(scan(b"@", true), Scanned::Invalid);
    assert_eq!(scan(b"\"ab\ncd\"", true), Scanned::Invalid);
    assert_eq!(scan(b"''", true), Scanned::Invalid);
    assert_eq!(scan(b"'\\q'", true), Scanned::Invalid);
    assert_eq!(scan(b"12ab ", true), Scanned::Invalid);
}

#[test]
fn test_scan_character_constants() {
    let character = |value| {
        Lexeme::new(
            TokenKind::Character,
            TokenFlags::empty(),
            Some(Payload::Unsigned(value)),
        )
    };

    assert_eq!(scan(b"'a'", true), Scanned::Token(3, character(97)));
    assert_eq!(scan(b"'\\n'", true), Scanned::Token(4, character(10)));
    assert_eq!(scan(b"'\"'", true), Scanned::Token(3, character(34)));
    assert_eq!(scan(b"'ab'", true), Scanned::Token(4, character(0x6162)));
}
