//! Small helpers shared by the rest of the crate, and intended for reuse by
//! set-reconciliation structures outside this crate (an Invertible Bloom
//! Lookup Table XORs fingerprint cells together the same way this helper
//! does).

/// XORs two byte strings treated as big-endian arbitrary-precision integers.
///
/// The shorter operand is implicitly zero-padded on its most-significant
/// (left) side to the length of the longer one, so the result always has
/// length `max(a.len(), b.len())` — except when every resulting byte is zero,
/// in which case the canonical zero representation (an empty byte string) is
/// returned instead.
///
/// `xor(xor(a, b), b) == a` and `xor(a, a) == []` both hold as a consequence.
pub fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    let (longer, shorter) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let pad = longer.len() - shorter.len();

    let mut out = Vec::with_capacity(longer.len());
    for (i, &lb) in longer.iter().enumerate() {
        let sb = if i < pad { 0 } else { shorter[i - pad] };
        out.push(lb ^ sb);
    }

    if out.iter().all(|&byte| byte == 0) {
        Vec::new()
    } else {
        out
    }
}
