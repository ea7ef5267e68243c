use std::hash::{DefaultHasher, Hash, Hasher};
use token::{Payload, Token, TokenId};

/// Structural digest of a token.
///
/// Linked and nested tokens contribute their own digests instead of their
/// ids, so the value only depends on the structure and never on the order in
/// which a store happened to publish records.
pub fn digest(token: &Token, digest_of: impl Fn(TokenId) -> u64) -> u64 {
    let mut hasher = DefaultHasher::new();

    token.kind().hash(&mut hasher);
    token.flags().bits().hash(&mut hasher);
    token.payload().len().hash(&mut hasher);

    for payload in token.payload() {
        match payload {
            Payload::Token(id) => {
                std::mem::discriminant(payload).hash(&mut hasher);
                digest_of(*id).hash(&mut hasher);
            }
            _ => payload.hash(&mut hasher),
        }
    }

    token.next().map(digest_of).hash(&mut hasher);
    hasher.finish()
}
