use crate::PreprocessorErrorKind;
use indexmap::IndexMap;
use itertools::Itertools;
use source_files::Source;

/// A recorded macro definition.
///
/// Definitions are kept for later passes, replacement text is never
/// substituted back into the output.
#[derive(Clone, Debug)]
pub struct Define {
    pub name: String,
    /// `None` for object-like macros
    pub parameters: Option<Vec<String>>,
    pub replacement: Vec<String>,
    pub source: Source,
}

impl Define {
    pub fn object(name: impl Into<String>, replacement: Vec<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            parameters: None,
            replacement,
            source,
        }
    }

    pub fn is_function_like(&self) -> bool {
        self.parameters.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Environment {
    defines: IndexMap<String, Define>,
}

impl Environment {
    /// Environment holding the standard predefined macros
    pub fn stdc() -> Self {
        let mut stdc = Self::default();

        stdc.add_define(Define::object("__STDC__", vec!["1".into()], Source::internal()));
        stdc.add_define(Define::object(
            "__STDC_VERSION__",
            vec!["199901L".into()],
            Source::internal(),
        ));

        stdc
    }

    /// Adds a command-line definition, a missing value means `1`
    pub fn add_predefined(&mut self, name: &str, value: Option<&str>) {
        let replacement = match value {
            Some(value) => split_pp_tokens(value),
            None => vec!["1".into()],
        };

        self.add_define(Define::object(name, replacement, Source::internal()));
    }

    pub fn add_define(&mut self, define: Define) {
        self.defines.insert(define.name.clone(), define);
    }

    pub fn find_define(&self, name: &str) -> Option<&Define> {
        self.defines.get(name)
    }

    pub fn remove_define(&mut self, name: &str) -> Option<Define> {
        self.defines.shift_remove(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits off the leading identifier of `text`
fn take_identifier(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());

    text.split_at(end)
}

/// Punctuators longer than one byte, longest first
const PUNCTUATORS: [&str; 24] = [
    "...", "<<=", ">>=", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=",
    "/=", "%=", "+=", "-=", "&=", "^=", "|=", "##", "::",
];

/// Splits replacement text into preprocessing tokens, whitespace between
/// them is dropped
pub fn split_pp_tokens(text: &str) -> Vec<String> {
    let mut tokens = vec![];
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let len = pp_token_len(rest);
        tokens.push(rest[..len].to_string());
        rest = rest[len..].trim_start();
    }

    tokens
}

fn pp_token_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let first = bytes[0];

    if first.is_ascii_alphabetic() || first == b'_' {
        return take_identifier(text).0.len();
    }

    if first.is_ascii_digit() || (first == b'.' && bytes.get(1).is_some_and(u8::is_ascii_digit)) {
        let mut len = 1;

        while let Some(&byte) = bytes.get(len) {
            let exponent_sign =
                matches!(byte, b'+' | b'-') && matches!(bytes[len - 1], b'e' | b'E' | b'p' | b'P');

            if !(byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.' || exponent_sign) {
                break;
            }

            len += 1;
        }

        return len;
    }

    if matches!(first, b'"' | b'\'') {
        let mut escape = false;

        for (i, byte) in bytes.iter().copied().enumerate().skip(1) {
            if escape {
                escape = false;
            } else if byte == b'\\' {
                escape = true;
            } else if byte == first {
                return i + 1;
            }
        }

        // Unterminated, the literal runs to the end of the line
        return bytes.len();
    }

    PUNCTUATORS
        .iter()
        .find(|punctuator| text.starts_with(*punctuator))
        .map_or_else(|| text.chars().next().map_or(1, char::len_utf8), |punctuator| punctuator.len())
}

/// Parses the body of a `#define` line.
///
/// A parameter list is only recognized when `(` directly follows the name,
/// `#define A (x)` is an object-like macro whose replacement is `(x)`.
pub fn parse_define(body: &str, source: Source) -> Result<Define, PreprocessorErrorKind> {
    let (name, rest) = take_identifier(body.trim_start());

    if !is_identifier(name) {
        return Err(PreprocessorErrorKind::MalformedDefine);
    }

    let (parameters, rest) = match rest.strip_prefix('(') {
        Some(rest) => {
            let (list, rest) = rest
                .split_once(')')
                .ok_or(PreprocessorErrorKind::MalformedDefine)?;

            let parameters = if list.trim().is_empty() {
                vec![]
            } else {
                list.split(',').map(str::trim).map(str::to_string).collect_vec()
            };

            let (variadic, named) = match parameters.split_last() {
                Some((last, named)) if last == "..." => (true, named),
                _ => (false, parameters.as_slice()),
            };

            if !named.iter().all(|parameter| is_identifier(parameter))
                || (!variadic && parameters.iter().any(|parameter| parameter == "..."))
            {
                return Err(PreprocessorErrorKind::MalformedDefine);
            }

            (Some(parameters), rest)
        }
        None => (None, rest),
    };

    Ok(Define {
        name: name.into(),
        parameters,
        replacement: split_pp_tokens(rest),
        source,
    })
}

/// Parses the body of an `#undef` line, giving the macro name
pub fn parse_undef(body: &str) -> Result<&str, PreprocessorErrorKind> {
    let (name, rest) = take_identifier(body.trim_start());

    if is_identifier(name) && rest.trim().is_empty() {
        Ok(name)
    } else {
        Err(PreprocessorErrorKind::MalformedUndef)
    }
}

#[test]
fn test_parse_object_macro() {
    let define = parse_define(" PI  3.14 ", Source::internal()).unwrap();

    assert_eq!(define.name, "PI");
    assert_eq!(define.parameters, None);
    assert_eq!(define.replacement, ["3.14"]);
}

#[test]
fn test_parse_function_macro() {
    let define = parse_define(" MAX(a, b) ((a) > (b) ? (a) : (b))", Source::internal()).unwrap();

    assert_eq!(define.name, "MAX");
    assert_eq!(define.parameters, Some(vec!["a".to_string(), "b".to_string()]));
    assert_eq!(
        define.replacement,
        ["(", "(", "a", ")", ">", "(", "b", ")", "?", "(", "a", ")", ":", "(", "b", ")", ")"]
    );

    let variadic = parse_define(" LOG(fmt, ...) printf(fmt)", Source::internal()).unwrap();
    assert_eq!(variadic.parameters, Some(vec!["fmt".to_string(), "...".to_string()]));

    let empty = parse_define(" NOTHING()", Source::internal()).unwrap();
    assert_eq!(empty.parameters, Some(vec![]));
    assert!(empty.replacement.is_empty());
}

#[test]
fn test_parse_parenthesized_object_macro() {
    let define = parse_define(" WRAPPED (x)", Source::internal()).unwrap();

    assert!(!define.is_function_like());
    assert_eq!(define.replacement, ["(", "x", ")"]);
}

#[test]
fn test_replacement_keeps_literals_whole() {
    let string = parse_define(r#" S "a  b" 'x y'"#, Source::internal()).unwrap();
    assert_eq!(string.replacement, [r#""a  b""#, "'x y'"]);

    let escaped = parse_define(r#" Q "say \"hi  there\"""#, Source::internal()).unwrap();
    assert_eq!(escaped.replacement, [r#""say \"hi  there\"""#]);
}

#[test]
fn test_replacement_splits_unspaced_operators() {
    let define = parse_define(" M(a,b) ((a)>(b))", Source::internal()).unwrap();
    assert_eq!(define.replacement, ["(", "(", "a", ")", ">", "(", "b", ")", ")"]);

    let shifted = parse_define(" SHIFT x<<=1.5e+3f;a->b", Source::internal()).unwrap();
    assert_eq!(shifted.replacement, ["x", "<<=", "1.5e+3f", ";", "a", "->", "b"]);

    let pasted = parse_define(" CAT(a,b) a##b", Source::internal()).unwrap();
    assert_eq!(pasted.replacement, ["a", "##", "b"]);
}

#[test]
fn test_parse_malformed_define() {
    for body in ["", "   ", " 1abc", " F(a", " F(a,,b)", " F(..., a)"] {
        assert_eq!(
            parse_define(body, Source::internal()).unwrap_err(),
            PreprocessorErrorKind::MalformedDefine,
            "{:?}",
            body
        );
    }
}

#[test]
fn test_parse_undef() {
    assert_eq!(parse_undef(" NAME "), Ok("NAME"));
    assert_eq!(parse_undef(" NAME extra"), Err(PreprocessorErrorKind::MalformedUndef));
    assert_eq!(parse_undef(""), Err(PreprocessorErrorKind::MalformedUndef));
}

#[test]
fn test_environment() {
    let mut environment = Environment::stdc();
    environment.add_predefined("DEBUG", None);
    environment.add_predefined("LEVEL", Some("3"));

    assert!(environment.is_defined("__STDC__"));
    assert_eq!(environment.find_define("DEBUG").unwrap().replacement, ["1"]);
    assert_eq!(environment.find_define("LEVEL").unwrap().replacement, ["3"]);

    assert!(environment.remove_define("DEBUG").is_some());
    assert!(!environment.is_defined("DEBUG"));
    assert_eq!(environment.len(), 3);
}
