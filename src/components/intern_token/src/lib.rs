/*
    ==================  components/intern_token/src/lib.rs  ===================
    Content-addressed store of immutable tokens.

    Every token is published exactly once per distinct structural value, so
    two handles compare equal if and only if they point at the same record.
    ---------------------------------------------------------------------------
*/

mod digest;
mod token_ref;

use append_only_vec::AppendOnlyVec;
use digest::digest;
use log::trace;
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Mutex, PoisonError},
};
use token::{MAX_PAYLOAD, Payload, Token, TokenFlags, TokenId, TokenKind};
pub use token_ref::TokenRef;

struct Entry {
    token: Token,
    digest: u64,
}

pub struct TokenStore {
    entries: AppendOnlyVec<Entry>,
    // Lookup-then-publish happens while holding this lock
    index: Mutex<HashMap<u64, Vec<TokenId>>>,
}

impl Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            entries: AppendOnlyVec::new(),
            index: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the canonical token for the given structural value.
    ///
    /// # Panics
    ///
    /// Panics if `next` or a [`Payload::Token`] slot refers to a token that
    /// was not published by this store.
    pub fn intern<'s>(
        &'s self,
        kind: TokenKind,
        flags: TokenFlags,
        slots: [Option<Payload>; MAX_PAYLOAD],
        next: Option<TokenRef<'s>>,
    ) -> TokenRef<'s> {
        if let Some(next) = next {
            assert!(next.belongs_to(self), "next token is from another store");
        }

        let candidate = Token::candidate(kind, flags, slots, next.map(|next| next.id()));

        for reference in candidate.references() {
            assert!(
                reference.index() < self.len(),
                "payload refers to a token that is not in this store"
            );
        }

        let digest = digest(&candidate, |id| self.digest_of(id));

        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = index.entry(digest).or_default();

        if let Some(existing) = bucket
            .iter()
            .copied()
            .find(|id| self.entries[id.index()].token == candidate)
        {
            // The candidate is dropped here, it was never published
            return TokenRef::new(self, existing);
        }

        if !bucket.is_empty() {
            trace!("token digest collision on {:016x}", digest);
        }

        let id = TokenId::new(self.entries.push(Entry {
            token: candidate,
            digest,
        }))
        .expect("too many tokens for a single store");

        bucket.push(id);
        TokenRef::new(self, id)
    }

    /// Interns a token with no payload and no link
    pub fn intern_bare(&self, kind: TokenKind) -> TokenRef<'_> {
        self.intern(kind, TokenFlags::empty(), [None, None, None], None)
    }

    /// Interns a token carrying a single payload slot
    pub fn intern_one(&self, kind: TokenKind, flags: TokenFlags, payload: Payload) -> TokenRef<'_> {
        self.intern(kind, flags, [Some(payload), None, None], None)
    }

    /// Re-interns `token` with its `next` link replaced
    pub fn relink<'s>(&'s self, token: TokenRef<'s>, next: Option<TokenRef<'s>>) -> TokenRef<'s> {
        let mut slots: [Option<Payload>; MAX_PAYLOAD] = [None, None, None];
        let mut packed = token.payload().iter().cloned();

        for (slot, presence) in slots.iter_mut().zip(TokenFlags::PAYLOAD_PRESENCE) {
            if token.flags().contains(presence) {
                *slot = packed.next();
            }
        }

        self.intern(token.kind(), token.flags(), slots, next)
    }

    pub fn get(&self, id: TokenId) -> Option<TokenRef<'_>> {
        (id.index() < self.len()).then(|| TokenRef::new(self, id))
    }

    fn token(&self, id: TokenId) -> &Token {
        &self.entries[id.index()].token
    }

    fn digest_of(&self, id: TokenId) -> u64 {
        self.entries[id.index()].digest
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_identical_tokens_share_a_handle() {
    let store = TokenStore::new();

    let a = store.intern(
        TokenKind::Integer,
        TokenFlags::HEXADECIMAL,
        [Some(Payload::Unsigned(42)), None, None],
        None,
    );
    let b = store.intern(
        TokenKind::Integer,
        TokenFlags::HEXADECIMAL,
        [Some(Payload::Unsigned(42)), None, None],
        None,
    );

    assert_eq!(a, b);
    assert!(std::ptr::eq(a.token(), b.token()));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_any_difference_yields_a_distinct_handle() {
    let store = TokenStore::new();
    let base = store.intern_one(TokenKind::Integer, TokenFlags::empty(), Payload::Unsigned(42));

    let other_payload =
        store.intern_one(TokenKind::Integer, TokenFlags::empty(), Payload::Unsigned(43));
    let other_kind =
        store.intern_one(TokenKind::IntegerSigned, TokenFlags::empty(), Payload::Unsigned(42));
    let other_flags = store.intern_one(TokenKind::Integer, TokenFlags::OCTAL, Payload::Unsigned(42));
    let other_slot = store.intern(
        TokenKind::Integer,
        TokenFlags::empty(),
        [None, Some(Payload::Unsigned(42)), None],
        None,
    );

    for other in [other_payload, other_kind, other_flags, other_slot] {
        assert_ne!(base, other);
    }

    assert_eq!(store.len(), 5);
}

#[test]
fn test_next_link_participates_in_identity() {
    let store = TokenStore::new();
    let semicolon = store.intern_bare(TokenKind::EndOfExpression);
    let comma = store.intern_bare(TokenKind::Comma);

    let a = store.intern(
        TokenKind::Identifier,
        TokenFlags::empty(),
        [Some(Payload::text("x")), None, None],
        Some(semicolon),
    );
    let b = store.intern(
        TokenKind::Identifier,
        TokenFlags::empty(),
        [Some(Payload::text("x")), None, None],
        Some(semicolon),
    );
    let c = store.intern(
        TokenKind::Identifier,
        TokenFlags::empty(),
        [Some(Payload::text("x")), None, None],
        Some(comma),
    );
    let unlinked = store.intern_one(TokenKind::Identifier, TokenFlags::empty(), Payload::text("x"));

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, unlinked);
    assert_eq!(a.next(), Some(semicolon));
    assert!(a.flags().contains(TokenFlags::HAVE_NEXT));
}

#[test]
fn test_digest_is_independent_of_publication_order() {
    let first = TokenStore::new();
    let second = TokenStore::new();

    // Publish unrelated tokens first so ids differ between the stores
    second.intern_bare(TokenKind::Comma);
    second.intern_bare(TokenKind::Colon);

    let build = |store: &TokenStore| {
        let tail = store.intern_bare(TokenKind::EndOfExpression);
        store
            .intern(
                TokenKind::ReturnKeyword,
                TokenFlags::empty(),
                [None, None, None],
                Some(tail),
            )
            .digest()
    };

    assert_eq!(build(&first), build(&second));
}

#[test]
fn test_relink_preserves_slot_positions() {
    let store = TokenStore::new();
    let tail = store.intern_bare(TokenKind::EndOfExpression);
    let token = store.intern(
        TokenKind::FloatingPoint,
        TokenFlags::empty(),
        [None, None, Some(Payload::float(1.5))],
        None,
    );

    let linked = store.relink(token, Some(tail));
    let unlinked = store.relink(linked, None);

    assert_eq!(linked.next(), Some(tail));
    assert!(linked.flags().contains(TokenFlags::HAVE_PAYLOAD_3));
    assert_eq!(unlinked, token);
}

#[test]
fn test_store_is_shareable_across_threads() {
    let store = TokenStore::new();

    let handles = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    store
                        .intern_one(TokenKind::String, TokenFlags::empty(), Payload::text("shared"))
                        .id()
                })
            })
            .collect();

        workers
            .into_iter()
            .map(|worker| worker.join().expect("worker panicked"))
            .collect::<Vec<_>>()
    });

    assert!(handles.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(store.len(), 1);
}
