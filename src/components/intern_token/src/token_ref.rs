use crate::TokenStore;
use by_address::ByAddress;
use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    ops::Deref,
};
use token::{Token, TokenId};

/// Non-owning handle to a canonical token.
///
/// Equality is identity: because the store never publishes two equal
/// records, comparing handles is the same as comparing token values.
#[derive(Copy, Clone)]
pub struct TokenRef<'s> {
    store: ByAddress<&'s TokenStore>,
    id: TokenId,
    token: &'s Token,
}

impl<'s> TokenRef<'s> {
    pub(crate) fn new(store: &'s TokenStore, id: TokenId) -> Self {
        Self {
            store: ByAddress(store),
            id,
            token: store.token(id),
        }
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn token(&self) -> &'s Token {
        self.token
    }

    pub fn digest(&self) -> u64 {
        self.store.digest_of(self.id)
    }

    pub fn next(&self) -> Option<TokenRef<'s>> {
        self.token
            .next()
            .map(|next| TokenRef::new(*self.store, next))
    }

    /// Follows `next` links starting at (and including) this token
    pub fn chain(self) -> impl Iterator<Item = TokenRef<'s>> {
        std::iter::successors(Some(self), TokenRef::next)
    }

    pub(crate) fn belongs_to(&self, store: &TokenStore) -> bool {
        std::ptr::eq(*self.store, store)
    }
}

impl PartialEq for TokenRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store && self.id == other.id
    }
}

impl Eq for TokenRef<'_> {}

impl Hash for TokenRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.store.hash(state);
        self.id.hash(state);
    }
}

impl Deref for TokenRef<'_> {
    type Target = Token;

    fn deref(&self) -> &Self::Target {
        self.token
    }
}

impl Debug for TokenRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenRef")
            .field(&self.id.index())
            .field(self.token)
            .finish()
    }
}

impl Display for TokenRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token.kind())?;

        for payload in self.token.payload() {
            write!(f, " {}", payload)?;
        }

        Ok(())
    }
}
