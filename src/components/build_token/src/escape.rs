/// Decodes the body of a string literal or character constant.
///
/// Gives `None` for an unknown escape sequence or an out of range octal or
/// hexadecimal escape.
pub fn unescape(body: &[u8]) -> Option<Vec<u8>> {
    let mut decoded = Vec::with_capacity(body.len());
    let mut bytes = body.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            decoded.push(byte);
            continue;
        }

        let escaped = match bytes.next()? {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0C,
            b'v' => 0x0B,
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            b'?' => b'?',
            b'x' => {
                let mut value: u32 = 0;
                let mut digits = 0;

                while let Some(digit) = bytes.peek().and_then(|byte| (*byte as char).to_digit(16)) {
                    value = value * 16 + digit;
                    digits += 1;
                    bytes.next();

                    if value > 0xFF {
                        return None;
                    }
                }

                if digits == 0 {
                    return None;
                }

                value as u8
            }
            first @ b'0'..=b'7' => {
                let mut value = u32::from(first - b'0');

                for _ in 0..2 {
                    match bytes.peek() {
                        Some(digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }

                u8::try_from(value).ok()?
            }
            _ => return None,
        };

        decoded.push(escaped);
    }

    Some(decoded)
}

#[test]
fn test_unescape() {
    assert_eq!(unescape(br"plain").unwrap(), b"plain");
    assert_eq!(unescape(br#"a\nb\t\\\""#).unwrap(), b"a\nb\t\\\"");
    assert_eq!(unescape(br"\x41\101\0").unwrap(), b"AA\0");
    assert_eq!(unescape(br"\x4g").unwrap(), b"\x04g");
    assert_eq!(unescape(br"\q"), None);
    assert_eq!(unescape(br"\x"), None);
    assert_eq!(unescape(br"\x100"), None);
    assert_eq!(unescape(br"\777"), None);
}
