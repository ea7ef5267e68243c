mod flags;
mod kind;
mod payload;

use arrayvec::ArrayVec;
pub use flags::TokenFlags;
pub use kind::TokenKind;
pub use payload::Payload;

/// Maximum number of payload slots a token can carry
pub const MAX_PAYLOAD: usize = 3;

/// Index of a canonical token inside the store that published it
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    pub fn new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Immutable token record.
///
/// Tokens are only ever published by the interning store, which guarantees
/// that structurally equal tokens share a single instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    kind: TokenKind,
    flags: TokenFlags,
    payload: ArrayVec<Payload, MAX_PAYLOAD>,
    next: Option<TokenId>,
}

impl Token {
    /// Builds a candidate record holding only the present payload slots.
    ///
    /// Presence bits for each slot and for `next` are recorded in the flags,
    /// so two candidates with the same packed payload but different slot
    /// positions remain distinct.
    pub fn candidate(
        kind: TokenKind,
        flags: TokenFlags,
        slots: [Option<Payload>; MAX_PAYLOAD],
        next: Option<TokenId>,
    ) -> Self {
        let mut flags = flags.user_bits();
        let mut payload = ArrayVec::new();

        for (slot, presence) in slots.into_iter().zip(TokenFlags::PAYLOAD_PRESENCE) {
            if let Some(value) = slot {
                flags |= presence;
                payload.push(value);
            }
        }

        if next.is_some() {
            flags |= TokenFlags::HAVE_NEXT;
        }

        Self {
            kind,
            flags,
            payload,
            next,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn flags(&self) -> TokenFlags {
        self.flags
    }

    pub fn payload(&self) -> &[Payload] {
        &self.payload
    }

    pub fn next(&self) -> Option<TokenId> {
        self.next
    }

    /// Token ids referenced by this record, whose digests feed into its own
    pub fn references(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.payload
            .iter()
            .filter_map(Payload::token_id)
            .chain(self.next)
    }
}

#[test]
fn test_candidate_packs_present_slots() {
    let token = Token::candidate(
        TokenKind::Integer,
        TokenFlags::empty(),
        [None, Some(Payload::Unsigned(7)), None],
        None,
    );

    assert_eq!(token.payload(), &[Payload::Unsigned(7)]);
    assert!(token.flags().contains(TokenFlags::HAVE_PAYLOAD_2));
    assert!(!token.flags().contains(TokenFlags::HAVE_PAYLOAD_1));
    assert!(!token.flags().contains(TokenFlags::HAVE_NEXT));
}

#[test]
fn test_candidate_ignores_caller_presence_bits() {
    let token = Token::candidate(
        TokenKind::Comma,
        TokenFlags::HAVE_NEXT | TokenFlags::from_bits_retain(0b10),
        [None, None, None],
        None,
    );

    assert_eq!(token.flags(), TokenFlags::from_bits_retain(0b10));
}
