use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Separator between the hex digest and the salt index in a checksum header.
pub const SALT_INDEX_SEPARATOR: &str = "###";

/// Checksum signer for the payment gateway's `X-VERIFY` scheme.
///
/// A checksum is `hex(sha256(payload || salt_key)) + "###" + salt_index`. The
/// same primitive signs outbound status queries (payload = request path) and
/// authenticates inbound callbacks (payload = raw request body).
#[derive(Clone)]
pub struct GatewaySigner {
    salt_key: Zeroizing<String>,
    salt_index: u32,
}

impl GatewaySigner {
    pub fn new(salt_key: impl Into<String>, salt_index: u32) -> Self {
        Self {
            salt_key: Zeroizing::new(salt_key.into()),
            salt_index,
        }
    }

    pub fn salt_index(&self) -> u32 {
        self.salt_index
    }

    /// Produce the full checksum header value for `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        format!(
            "{}{}{}",
            self.digest_hex(payload),
            SALT_INDEX_SEPARATOR,
            self.salt_index
        )
    }

    /// Check a provided checksum header against the expected value for `payload`.
    ///
    /// Comparison is constant time over the normalized header. The hex digest is
    /// matched case-insensitively; the salt index must match exactly.
    pub fn verify(&self, payload: &[u8], provided: &str) -> bool {
        let expected = self.sign(payload);
        let provided = normalize(provided);
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    fn digest_hex(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.update(self.salt_key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn normalize(provided: &str) -> String {
    let trimmed = provided.trim();
    match trimmed.split_once(SALT_INDEX_SEPARATOR) {
        Some((digest, index)) => format!(
            "{}{}{}",
            digest.to_ascii_lowercase(),
            SALT_INDEX_SEPARATOR,
            index
        ),
        None => trimmed.to_ascii_lowercase(),
    }
}

impl std::fmt::Debug for GatewaySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySigner")
            .field("salt_key", &"***redacted***")
            .field("salt_index", &self.salt_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> GatewaySigner {
        GatewaySigner::new("salt-key-1", 1)
    }

    #[test]
    fn body_checksum_matches_known_vector() {
        let sig = signer().sign(br#"{"code":"PAYMENT_SUCCESS"}"#);
        assert_eq!(
            sig,
            "6d5364c534981d2354f568e770333c1659a7480213f55136898deab7bbf0b93d###1"
        );
    }

    #[test]
    fn path_checksum_matches_known_vector() {
        let sig = signer().sign(b"/pg/v1/status/MERCHANTUAT/O12345-attempt2");
        assert_eq!(
            sig,
            "52db7024e78c1d603c172c4f3779b1149919e3dbe9c31631daa128df0b482a96###1"
        );
    }

    #[test]
    fn verify_accepts_own_signature() {
        let s = signer();
        let body = b"{\"merchantTransactionId\":\"O1-1\"}";
        assert!(s.verify(body, &s.sign(body)));
    }

    #[test]
    fn verify_tolerates_uppercase_hex_and_whitespace() {
        let s = signer();
        let body = b"{}";
        let sig = s.sign(body);
        let (digest, index) = sig.split_once("###").unwrap();
        let shouted = format!("  {}###{} ", digest.to_ascii_uppercase(), index);
        assert!(s.verify(body, &shouted));
    }

    #[test]
    fn verify_rejects_wrong_secret_index_or_body() {
        let s = signer();
        let body = b"{}";
        assert!(!s.verify(body, &GatewaySigner::new("other", 1).sign(body)));
        assert!(!s.verify(body, &GatewaySigner::new("salt-key-1", 2).sign(body)));
        assert!(!s.verify(b"{ }", &s.sign(body)));
        assert!(!s.verify(body, ""));
    }

    #[test]
    fn debug_redacts_salt_key() {
        let rendered = format!("{:?}", signer());
        assert!(!rendered.contains("salt-key-1"));
        assert!(rendered.contains("redacted"));
    }
}
