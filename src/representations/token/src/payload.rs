use crate::TokenId;
use derive_more::IsVariant;
use ordered_float::OrderedFloat;
use std::{fmt::Display, sync::Arc};

/// One typed payload slot of a token
#[derive(Clone, Debug, PartialEq, Eq, Hash, IsVariant)]
pub enum Payload {
    Unsigned(u64),
    Signed(i64),
    Float(OrderedFloat<f64>),
    Text(Arc<str>),
    Token(TokenId),
}

impl Payload {
    pub fn float(value: f64) -> Self {
        Self::Float(OrderedFloat(value))
    }

    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(Arc::from(value.as_ref()))
    }

    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            Self::Token(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Unsigned(value) => write!(f, "{}", value),
            Payload::Signed(value) => write!(f, "{}", value),
            Payload::Float(value) => write!(f, "{}", value),
            Payload::Text(text) => write!(f, "{:?}", text),
            Payload::Token(id) => write!(f, "#{}", id.index()),
        }
    }
}
