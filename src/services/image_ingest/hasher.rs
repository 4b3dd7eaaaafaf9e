use super::ContentHasher;
use crate::utils::hash::calculate_hash;

pub struct Sha1Hasher;

impl ContentHasher for Sha1Hasher {
    fn digest_hex(&self, bytes: &[u8]) -> String {
        calculate_hash(bytes)
    }
}
