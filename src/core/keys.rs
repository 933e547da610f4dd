//! Recognition of EOS private keys.
//!
//! Used to stop a private key from being sent to a public-key lookup.

const WIF_VERSION: u8 = 0x80;
const K1_PRIVATE_PREFIX: &str = "PVT_K1_";

/// Returns `true` when `key` is a well-formed EOS private key.
///
/// Legacy WIF keys are checked fully (version byte plus double-SHA256
/// checksum). `PVT_K1_` keys are checked for shape only: 32 key bytes and a
/// 4 byte checksum.
pub fn is_valid_private_key(key: &str) -> bool {
    let key = key.trim();
    if let Some(body) = key.strip_prefix(K1_PRIVATE_PREFIX) {
        return bs58::decode(body)
            .into_vec()
            .map(|bytes| bytes.len() == 36)
            .unwrap_or(false);
    }
    bs58::decode(key)
        .with_check(Some(WIF_VERSION))
        .into_vec()
        .map(|bytes| bytes.len() == 33)
        .unwrap_or(false)
}
