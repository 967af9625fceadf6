//! Byte-order helpers shared across the crate.
//!
//! RFC 8391 encodes all integers in big-endian byte order (the `toByte`
//! function from the RFC). These helpers convert between `u64` and
//! arbitrary-width big-endian byte strings.

/// Writes `value` into `out` in big-endian byte order, filling the whole slice.
///
/// This is `toByte(value, out.len())` from RFC 8391. Values wider than the
/// slice are silently truncated to the low-order bytes.
pub fn ull_to_bytes(out: &mut [u8], value: u64) {
    let mut v = value;
    for byte in out.iter_mut().rev() {
        *byte = (v & 0xff) as u8;
        v >>= 8;
    }
}

/// Reads a big-endian integer from `input`.
///
/// Inverse of [`ull_to_bytes`] for slices of up to 8 bytes.
pub fn bytes_to_ull(input: &[u8]) -> u64 {
    let mut result = 0u64;
    for &byte in input {
        result = (result << 8) | u64::from(byte);
    }
    result
}
