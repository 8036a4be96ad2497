use std::fmt;

use rand::Rng;

/// Characters a subscription token is drawn from
pub const TOKEN_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random alphanumeric token used to confirm and cancel a subscription.
///
/// Holding the token is the only credential needed for either operation,
/// so it is never rotated once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    /// Generate a token of `len` characters with the thread-local RNG
    pub fn generate(len: usize) -> Self {
        Self::generate_with(&mut rand::thread_rng(), len)
    }

    /// Generate a token of `len` characters, each drawn uniformly and
    /// independently from [`TOKEN_ALPHABET`]
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let token = (0..len)
            .map(|_| char::from(TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())]))
            .collect();

        Self(token)
    }
}

impl AsRef<str> for SubscriptionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
