mod token;

pub use token::{SubscriptionToken, TOKEN_ALPHABET};
