use derive_more::IsVariant;
use std::fmt::Display;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum TokenKind {
    None,
    EndOfFile,
    Comment,
    Whitespace,

    // Literals
    Integer,
    IntegerSigned,
    FloatingPoint,
    String,
    Character,
    Identifier,

    // Punctuation
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    EndOfExpression,
    Comma,
    Dot,
    Arrow,
    Ellipsis,
    Ternary,
    Colon,
    Hash,
    HashHash,
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Increment,
    Decrement,
    ShiftLeft,
    ShiftRight,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModulusAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    LessThan,
    GreaterThan,
    LessThanEq,
    GreaterThanEq,
    Equality,
    NotEquals,
    Not,
    BitComplement,
    Ampersand,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,

    // Keywords
    AutoKeyword,
    BreakKeyword,
    CaseKeyword,
    CharKeyword,
    ConstKeyword,
    ContinueKeyword,
    DefaultKeyword,
    DoKeyword,
    DoubleKeyword,
    ElseKeyword,
    EnumKeyword,
    ExternKeyword,
    FloatKeyword,
    ForKeyword,
    GotoKeyword,
    IfKeyword,
    InlineKeyword,
    IntKeyword,
    LongKeyword,
    RegisterKeyword,
    RestrictKeyword,
    ReturnKeyword,
    ShortKeyword,
    SignedKeyword,
    SizeofKeyword,
    StaticKeyword,
    StructKeyword,
    SwitchKeyword,
    TypedefKeyword,
    UnionKeyword,
    UnsignedKeyword,
    VoidKeyword,
    VolatileKeyword,
    WhileKeyword,
    BoolKeyword,
    ComplexKeyword,
    ImaginaryKeyword,

    // Logical categories, produced by later passes rather than the lexer
    Block,
    Group,
    Declaration,
    Definition,
    Type,
    Variable,
    Literal,
    Label,
    Typecast,
}

impl TokenKind {
    pub const KEYWORDS: &'static [(&'static str, TokenKind)] = &[
        ("auto", Self::AutoKeyword),
        ("break", Self::BreakKeyword),
        ("case", Self::CaseKeyword),
        ("char", Self::CharKeyword),
        ("const", Self::ConstKeyword),
        ("continue", Self::ContinueKeyword),
        ("default", Self::DefaultKeyword),
        ("do", Self::DoKeyword),
        ("double", Self::DoubleKeyword),
        ("else", Self::ElseKeyword),
        ("enum", Self::EnumKeyword),
        ("extern", Self::ExternKeyword),
        ("float", Self::FloatKeyword),
        ("for", Self::ForKeyword),
        ("goto", Self::GotoKeyword),
        ("if", Self::IfKeyword),
        ("inline", Self::InlineKeyword),
        ("int", Self::IntKeyword),
        ("long", Self::LongKeyword),
        ("register", Self::RegisterKeyword),
        ("restrict", Self::RestrictKeyword),
        ("return", Self::ReturnKeyword),
        ("short", Self::ShortKeyword),
        ("signed", Self::SignedKeyword),
        ("sizeof", Self::SizeofKeyword),
        ("static", Self::StaticKeyword),
        ("struct", Self::StructKeyword),
        ("switch", Self::SwitchKeyword),
        ("typedef", Self::TypedefKeyword),
        ("union", Self::UnionKeyword),
        ("unsigned", Self::UnsignedKeyword),
        ("void", Self::VoidKeyword),
        ("volatile", Self::VolatileKeyword),
        ("while", Self::WhileKeyword),
        ("_Bool", Self::BoolKeyword),
        ("_Complex", Self::ComplexKeyword),
        ("_Imaginary", Self::ImaginaryKeyword),
    ];

    pub fn keyword(identifier: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == identifier)
            .map(|(_, kind)| *kind)
    }

    /// Punctuator spellings, longest first so that greedy matching works
    pub const PUNCTUATORS: &'static [(&'static str, TokenKind)] = &[
        ("...", Self::Ellipsis),
        ("<<=", Self::ShiftLeftAssign),
        (">>=", Self::ShiftRightAssign),
        ("->", Self::Arrow),
        ("++", Self::Increment),
        ("--", Self::Decrement),
        ("<<", Self::ShiftLeft),
        (">>", Self::ShiftRight),
        ("<=", Self::LessThanEq),
        (">=", Self::GreaterThanEq),
        ("==", Self::Equality),
        ("!=", Self::NotEquals),
        ("&&", Self::LogicalAnd),
        ("||", Self::LogicalOr),
        ("+=", Self::AddAssign),
        ("-=", Self::SubtractAssign),
        ("*=", Self::MultiplyAssign),
        ("/=", Self::DivideAssign),
        ("%=", Self::ModulusAssign),
        ("&=", Self::BitAndAssign),
        ("|=", Self::BitOrAssign),
        ("^=", Self::BitXorAssign),
        ("##", Self::HashHash),
        ("(", Self::OpenParen),
        (")", Self::CloseParen),
        ("{", Self::OpenBrace),
        ("}", Self::CloseBrace),
        ("[", Self::OpenBracket),
        ("]", Self::CloseBracket),
        (";", Self::EndOfExpression),
        (",", Self::Comma),
        (".", Self::Dot),
        ("?", Self::Ternary),
        (":", Self::Colon),
        ("#", Self::Hash),
        ("=", Self::Assign),
        ("+", Self::Add),
        ("-", Self::Subtract),
        ("*", Self::Multiply),
        ("/", Self::Divide),
        ("%", Self::Modulus),
        ("<", Self::LessThan),
        (">", Self::GreaterThan),
        ("!", Self::Not),
        ("~", Self::BitComplement),
        ("&", Self::Ampersand),
        ("|", Self::BitOr),
        ("^", Self::BitXor),
    ];

    pub fn is_keyword(&self) -> bool {
        Self::KEYWORDS.iter().any(|(_, kind)| kind == self)
    }

    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Self::Block
                | Self::Group
                | Self::Declaration
                | Self::Definition
                | Self::Type
                | Self::Variable
                | Self::Literal
                | Self::Label
                | Self::Typecast
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some((spelling, _)) = Self::PUNCTUATORS.iter().find(|(_, kind)| kind == self) {
            return write!(f, "'{}'", spelling);
        }

        if let Some((spelling, _)) = Self::KEYWORDS.iter().find(|(_, kind)| kind == self) {
            return write!(f, "keyword '{}'", spelling);
        }

        f.write_str(match self {
            Self::None => "none",
            Self::EndOfFile => "end-of-file",
            Self::Comment => "comment",
            Self::Whitespace => "whitespace",
            Self::Integer => "integer",
            Self::IntegerSigned => "signed integer",
            Self::FloatingPoint => "floating point",
            Self::String => "string",
            Self::Character => "character",
            Self::Identifier => "identifier",
            Self::Block => "block",
            Self::Group => "group",
            Self::Declaration => "declaration",
            Self::Definition => "definition",
            Self::Type => "type",
            Self::Variable => "variable",
            Self::Literal => "literal",
            Self::Label => "label",
            Self::Typecast => "typecast",
            _ => "unknown",
        })
    }
}

#[test]
fn test_punctuators_are_longest_first() {
    for (i, (spelling, _)) in TokenKind::PUNCTUATORS.iter().enumerate() {
        for (later, _) in &TokenKind::PUNCTUATORS[i + 1..] {
            assert!(
                !(later.len() > spelling.len() && later.starts_with(spelling)),
                "'{}' would shadow '{}'",
                spelling,
                later
            );
        }
    }
}

#[test]
fn test_keywords() {
    assert_eq!(TokenKind::keyword("while"), Some(TokenKind::WhileKeyword));
    assert_eq!(TokenKind::keyword("whilst"), None);
    assert!(TokenKind::ReturnKeyword.is_keyword());
    assert!(!TokenKind::Identifier.is_keyword());
}
