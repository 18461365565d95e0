use sha2::{Digest, Sha256};

/// Digest under which an API token is stored; tokens are never kept in clear.
pub fn hash_api_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        let digest = hash_api_token("secret-token");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_api_token("secret-token"));
        assert_ne!(digest, hash_api_token("other-token"));
    }
}
