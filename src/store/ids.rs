//! Record identifiers: a fixed prefix plus a random uppercase alphanumeric
//! suffix, retried until it does not collide within its collection.

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const USER_PREFIX: &str = "USER-";
pub const ACCOUNT_PREFIX: &str = "ACC-";
pub const CARD_PREFIX: &str = "CARD-";
pub const TRANSACTION_PREFIX: &str = "TXN-";
pub const DISPUTE_PREFIX: &str = "TXN-DISPUTE-";

pub const SUFFIX_LEN: usize = 9;

pub fn random_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generate `prefix + suffix` until `taken` reports it free
pub fn unique_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = format!("{}{}", prefix, random_suffix(SUFFIX_LEN));
        if !taken(&candidate) {
            return candidate;
        }
        tracing::debug!("Id collision on {}, retrying", candidate);
    }
}
