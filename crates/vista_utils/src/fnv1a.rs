pub const FNV_PRIME: u32 = 16777619;
pub const OFFSET_BASIS: u32 = 2166136261;

/// Performs a 32-bit FNV-1a hash. Used for deriving stable pick identifiers from names.
///
/// Unlike some game engines, no case folding is done, so `Left` and `left` hash differently.
///
/// ## Example
/// ```
/// use vista_utils::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash(b""), 0x811c9dc5);
/// assert_eq!(fnv1a_hash(b"a"), 0xe40c292c);
/// assert_ne!(fnv1a_hash(b"Left"), fnv1a_hash(b"left"));
/// ```
pub fn fnv1a_hash(buffer: &[u8]) -> u32 {
    let mut result = OFFSET_BASIS;
    for &byte in buffer {
        result ^= byte as u32;
        result = result.wrapping_mul(FNV_PRIME);
    }
    result
}
