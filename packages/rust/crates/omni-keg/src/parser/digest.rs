use xxhash_rust::xxh3::xxh3_128;

/// Stable 128-bit content digest rendered as 32 lowercase hex chars.
///
/// Used for change detection only.
#[must_use]
pub fn content_digest(raw: &[u8]) -> String {
    format!("{:032x}", xxh3_128(raw))
}
