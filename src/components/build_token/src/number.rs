use crate::Lexeme;
use token::{Payload, TokenFlags, TokenKind};

/// Interprets a preprocessing number, `None` when it is not a valid literal
pub fn parse_number(text: &str) -> Option<Lexeme> {
    let is_hex = text.starts_with("0x") || text.starts_with("0X");

    let is_float = !is_hex
        && text
            .trim_end_matches(['f', 'F', 'l', 'L'])
            .contains(['.', 'e', 'E']);

    if is_float {
        parse_float(text)
    } else {
        parse_integer(text, is_hex)
    }
}

fn parse_float(text: &str) -> Option<Lexeme> {
    let (mantissa, flags) = match text.as_bytes().last()? {
        b'f' | b'F' => (&text[..text.len() - 1], TokenFlags::FLOAT_SUFFIX),
        b'l' | b'L' => (&text[..text.len() - 1], TokenFlags::LONG_SUFFIX),
        _ => (text, TokenFlags::empty()),
    };

    // Reject things Rust accepts but C does not, like "inf" or "1_0"
    if !mantissa
        .bytes()
        .all(|byte| byte.is_ascii_digit() || matches!(byte, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }

    let value = mantissa.parse::<f64>().ok()?;

    Some(Lexeme::new(
        TokenKind::FloatingPoint,
        flags,
        Some(Payload::float(value)),
    ))
}

fn parse_integer(text: &str, is_hex: bool) -> Option<Lexeme> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let suffix = &text[digits.len()..];
    let mut flags = suffix_flags(suffix)?;

    let (digits, radix) = if is_hex {
        flags |= TokenFlags::HEXADECIMAL;
        (&digits[2..], 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        flags |= TokenFlags::OCTAL;
        (&digits[1..], 8)
    } else {
        (digits, 10)
    };

    // from_str_radix would otherwise accept a sign
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
        return None;
    }

    let value = u64::from_str_radix(digits, radix).ok()?;

    Some(Lexeme::new(
        TokenKind::Integer,
        flags,
        Some(Payload::Unsigned(value)),
    ))
}

fn suffix_flags(suffix: &str) -> Option<TokenFlags> {
    let lower = suffix.to_ascii_lowercase();

    let (unsigned, long) = match lower.as_str() {
        "" => (false, ""),
        "u" => (true, ""),
        "l" | "ll" => (false, suffix),
        "ul" | "ull" => (true, &suffix[1..]),
        "lu" | "llu" => (true, &suffix[..suffix.len() - 1]),
        _ => return None,
    };

    // "lL" is not a valid suffix
    if long.len() == 2 && long.as_bytes()[0] != long.as_bytes()[1] {
        return None;
    }

    let mut flags = TokenFlags::empty();

    if unsigned {
        flags |= TokenFlags::UNSIGNED_SUFFIX;
    }

    if !long.is_empty() {
        flags |= TokenFlags::LONG_SUFFIX;
    }

    Some(flags)
}

#[cfg(test)]
fn integer(text: &str) -> Option<(u64, TokenFlags)> {
    let lexeme = parse_number(text)?;
    assert_eq!(lexeme.kind, TokenKind::Integer);

    match lexeme.payload {
        Some(Payload::Unsigned(value)) => Some((value, lexeme.flags)),
        _ => None,
    }
}

#[test]
fn test_integers() {
    assert_eq!(integer("0"), Some((0, TokenFlags::empty())));
    assert_eq!(integer("42"), Some((42, TokenFlags::empty())));
    assert_eq!(integer("0x1F"), Some((31, TokenFlags::HEXADECIMAL)));
    assert_eq!(integer("017"), Some((15, TokenFlags::OCTAL)));
    assert_eq!(
        integer("10uLL"),
        Some((10, TokenFlags::UNSIGNED_SUFFIX | TokenFlags::LONG_SUFFIX))
    );
    assert_eq!(integer("7lu"), Some((7, TokenFlags::UNSIGNED_SUFFIX | TokenFlags::LONG_SUFFIX)));
    assert_eq!(integer("18446744073709551615"), Some((u64::MAX, TokenFlags::empty())));
}

#[test]
fn test_invalid_integers() {
    assert!(parse_number("18446744073709551616").is_none());
    assert!(parse_number("09").is_none());
    assert!(parse_number("0x").is_none());
    assert!(parse_number("12abc").is_none());
    assert!(parse_number("1lL").is_none());
    assert!(parse_number("1uu").is_none());
}

#[test]
fn test_floats() {
    let lexeme = parse_number("1.5e3f").unwrap();
    assert_eq!(lexeme.kind, TokenKind::FloatingPoint);
    assert_eq!(lexeme.flags, TokenFlags::FLOAT_SUFFIX);
    assert_eq!(lexeme.payload, Some(Payload::float(1500.0)));

    assert_eq!(parse_number(".25").unwrap().payload, Some(Payload::float(0.25)));
    assert_eq!(parse_number("2.").unwrap().payload, Some(Payload::float(2.0)));
    assert_eq!(parse_number("1e-2L").unwrap().flags, TokenFlags::LONG_SUFFIX);
    assert!(parse_number("1.2.3").is_none());
}
