use sha1::{Digest, Sha1};

/// Lower-case hex SHA-1 of `data`.
pub fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}
