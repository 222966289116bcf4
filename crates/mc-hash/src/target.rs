/// Returns `true` when the first `difficulty` characters of `hash` are all
/// `'0'`.
///
/// A difficulty of zero is always met. A difficulty longer than the hash can
/// never be met.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
