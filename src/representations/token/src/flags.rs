use bitflags::bitflags;

bitflags! {
    /// Flag bits of a token.
    ///
    /// The top four bits are owned by the interning store and record which
    /// payload slots and links are present. All lower bits belong to the
    /// producer of the token.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct TokenFlags: u64 {
        const HAVE_PAYLOAD_1 = 1 << 63;
        const HAVE_PAYLOAD_2 = 1 << 62;
        const HAVE_PAYLOAD_3 = 1 << 61;
        const HAVE_NEXT = 1 << 60;

        /// Integer literal carried an unsigned suffix
        const UNSIGNED_SUFFIX = 1 << 0;
        /// Integer or floating point literal carried a long suffix
        const LONG_SUFFIX = 1 << 1;
        /// Integer literal was written in hexadecimal
        const HEXADECIMAL = 1 << 2;
        /// Integer literal was written in octal
        const OCTAL = 1 << 3;
        /// Floating point literal carried a float suffix
        const FLOAT_SUFFIX = 1 << 4;

        const _ = !0;
    }
}

impl TokenFlags {
    pub const PAYLOAD_PRESENCE: [Self; 3] = [
        Self::HAVE_PAYLOAD_1,
        Self::HAVE_PAYLOAD_2,
        Self::HAVE_PAYLOAD_3,
    ];

    pub const STORE_OWNED: Self = Self::HAVE_PAYLOAD_1
        .union(Self::HAVE_PAYLOAD_2)
        .union(Self::HAVE_PAYLOAD_3)
        .union(Self::HAVE_NEXT);

    pub fn user_bits(self) -> Self {
        self.difference(Self::STORE_OWNED)
    }
}
