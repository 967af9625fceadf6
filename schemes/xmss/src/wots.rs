//! WOTS+ one-time signatures (RFC 8391 section 3).
//!
//! A WOTS+ key pair consists of `len` hash chains of length w. Signing
//! reveals intermediate chain values at positions determined by the base-w
//! digits of the message digest plus a checksum; verification walks the
//! revealed values to the chain ends and must arrive at the public key.
//!
//! There are no failure modes here. A wrong message or signature produces a
//! wrong public key, which surfaces one layer up as a Merkle root mismatch.

use crate::address::Address;
use crate::hash::{prf, thash_f, HashCtx};
use crate::params::Params;
use crate::utils::ull_to_bytes;

/// Expands an n-byte seed into `len` chain-start values using
/// `PRF(seed, toByte(chain, 32))`.
fn expand_seed(seed: &[u8], params: &Params) -> Vec<u8> {
    let mut expanded = Vec::with_capacity(params.wots_len * params.n);
    let mut ctr = [0u8; 32];
    for i in 0..params.wots_len {
        ull_to_bytes(&mut ctr, i as u64);
        expanded.extend_from_slice(&prf(seed, &ctr, params));
    }
    expanded
}

/// Walks `steps` chain positions starting from position `start`.
///
/// The chain is capped at w - 1; requesting more steps silently stops at
/// the end of the chain.
fn gen_chain(
    input: &[u8],
    start: u32,
    steps: u32,
    ctx: &HashCtx,
    addr: &mut Address,
    params: &Params,
) -> Vec<u8> {
    let mut out = input[..params.n].to_vec();
    let mut i = start;
    while i < start + steps && i < params.wots_w as u32 {
        addr.set_hash(i);
        out = thash_f(&out, ctx, addr, params);
        i += 1;
    }
    out
}

/// Interprets `input` as `out_len` base-w digits, most significant bits
/// first. Only valid when log2(w) divides 8.
fn base_w(input: &[u8], out_len: usize, params: &Params) -> Vec<u32> {
    let mut output = Vec::with_capacity(out_len);
    let mut pos = 0;
    let mut total = 0u8;
    let mut bits = 0;

    for _ in 0..out_len {
        if bits == 0 {
            total = input[pos];
            pos += 1;
            bits = 8;
        }
        bits -= params.wots_log_w;
        output.push(u32::from(total >> bits) & (params.wots_w as u32 - 1));
    }
    output
}

/// Computes the checksum digits over the message digits.
///
/// The checksum sums the remaining chain capacity of every message chain,
/// so shortening any message chain forces lengthening a checksum chain.
fn wots_checksum(msg_base_w: &[u32], params: &Params) -> Vec<u32> {
    let mut csum: u64 = 0;
    for &digit in msg_base_w {
        csum += (params.wots_w as u64) - 1 - u64::from(digit);
    }

    // Left-align the checksum so that the unused low bits are zero.
    csum <<= (8 - ((params.wots_len2 * params.wots_log_w) % 8)) % 8;
    let csum_bytes_len = (params.wots_len2 * params.wots_log_w + 7) / 8;
    let mut csum_bytes = vec![0u8; csum_bytes_len];
    ull_to_bytes(&mut csum_bytes, csum);

    base_w(&csum_bytes, params.wots_len2, params)
}

/// Derives the chain positions for a message digest: `len1` message digits
/// followed by `len2` checksum digits.
pub fn chain_lengths(msg: &[u8], params: &Params) -> Vec<u32> {
    let mut lengths = base_w(msg, params.wots_len1, params);
    lengths.extend(wots_checksum(&lengths, params));
    lengths
}

/// Generates the WOTS+ public key for the key pair at `addr`: every chain
/// walked from the expanded seed to its end.
pub fn wots_pkgen(seed: &[u8], ctx: &HashCtx, addr: &mut Address, params: &Params) -> Vec<u8> {
    let mut pk = expand_seed(seed, params);
    for i in 0..params.wots_len {
        addr.set_chain(i as u32);
        let chain_end = gen_chain(
            &pk[i * params.n..(i + 1) * params.n],
            0,
            params.wots_w as u32 - 1,
            ctx,
            addr,
            params,
        );
        pk[i * params.n..(i + 1) * params.n].copy_from_slice(&chain_end);
    }
    pk
}

/// Signs an n-byte message digest: every chain walked from the expanded
/// seed to the position given by [`chain_lengths`].
pub fn wots_sign(
    msg: &[u8],
    seed: &[u8],
    ctx: &HashCtx,
    addr: &mut Address,
    params: &Params,
) -> Vec<u8> {
    let lengths = chain_lengths(msg, params);
    let mut sig = expand_seed(seed, params);
    for i in 0..params.wots_len {
        addr.set_chain(i as u32);
        let node = gen_chain(
            &sig[i * params.n..(i + 1) * params.n],
            0,
            lengths[i],
            ctx,
            addr,
            params,
        );
        sig[i * params.n..(i + 1) * params.n].copy_from_slice(&node);
    }
    sig
}

/// Recomputes the WOTS+ public key from a signature: every revealed chain
/// value walked the remaining `w - 1 - lengths[i]` positions.
pub fn wots_pk_from_sig(
    sig: &[u8],
    msg: &[u8],
    ctx: &HashCtx,
    addr: &mut Address,
    params: &Params,
) -> Vec<u8> {
    let lengths = chain_lengths(msg, params);
    let mut pk = vec![0u8; params.wots_sig_bytes];
    for i in 0..params.wots_len {
        addr.set_chain(i as u32);
        let node = gen_chain(
            &sig[i * params.n..(i + 1) * params.n],
            lengths[i],
            params.wots_w as u32 - 1 - lengths[i],
            ctx,
            addr,
            params,
        );
        pk[i * params.n..(i + 1) * params.n].copy_from_slice(&node);
    }
    pk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HashFunc;

    fn setup() -> (Params, HashCtx, Vec<u8>) {
        let params = Params::new(HashFunc::Sha2, 32, 10, 1, 16, 0).unwrap();
        let pub_seed = vec![0x42u8; params.n];
        let ctx = HashCtx::new(&pub_seed, &params);
        (params, ctx, pub_seed)
    }

    #[test]
    fn test_base_w_msb_first() {
        let params = Params::new(HashFunc::Sha2, 32, 10, 1, 16, 0).unwrap();
        // 0x12 0x34 splits into nibbles 1, 2, 3, 4.
        assert_eq!(base_w(&[0x12, 0x34], 4, &params), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_chain_lengths_checksum() {
        let (params, _, _) = setup();
        let msg = vec![0u8; params.n];
        let lengths = chain_lengths(&msg, &params);
        assert_eq!(lengths.len(), params.wots_len);

        // All-zero digits give the maximum checksum: len1 * (w - 1) = 960,
        // which is 0x3C0, digits 3, 12, 0.
        assert!(lengths[..params.wots_len1].iter().all(|&l| l == 0));
        assert_eq!(&lengths[params.wots_len1..], &[3, 12, 0]);
    }

    #[test]
    fn test_chain_lengths_in_range() {
        let (params, _, _) = setup();
        let msg: Vec<u8> = (0..params.n as u8).collect();
        for &l in &chain_lengths(&msg, &params) {
            assert!(l < params.wots_w as u32);
        }
    }

    #[test]
    fn test_sign_then_recover_pk() {
        let (params, ctx, _) = setup();
        let seed = vec![0x13u8; params.n];
        let msg: Vec<u8> = (0..params.n as u8).map(|i| i.wrapping_mul(7)).collect();

        let mut addr = Address::new();
        addr.set_ots(5);
        let pk = wots_pkgen(&seed, &ctx, &mut addr, &params);

        let mut addr = Address::new();
        addr.set_ots(5);
        let sig = wots_sign(&msg, &seed, &ctx, &mut addr, &params);

        let mut addr = Address::new();
        addr.set_ots(5);
        let recovered = wots_pk_from_sig(&sig, &msg, &ctx, &mut addr, &params);

        assert_eq!(pk, recovered);
    }

    #[test]
    fn test_wrong_message_recovers_wrong_pk() {
        let (params, ctx, _) = setup();
        let seed = vec![0x13u8; params.n];
        let msg = vec![0xaau8; params.n];
        let mut tampered = msg.clone();
        tampered[0] ^= 1;

        let mut addr = Address::new();
        let pk = wots_pkgen(&seed, &ctx, &mut addr, &params);
        let mut addr = Address::new();
        let sig = wots_sign(&msg, &seed, &ctx, &mut addr, &params);
        let mut addr = Address::new();
        let recovered = wots_pk_from_sig(&sig, &tampered, &ctx, &mut addr, &params);

        assert_ne!(pk, recovered);
    }

    #[test]
    fn test_gen_chain_caps_at_w() {
        let (params, ctx, _) = setup();
        let input = vec![9u8; params.n];

        let mut addr = Address::new();
        let capped = gen_chain(&input, 0, params.wots_w as u32, &ctx, &mut addr, &params);
        let mut addr = Address::new();
        let overshoot = gen_chain(&input, 0, params.wots_w as u32 + 5, &ctx, &mut addr, &params);
        assert_eq!(capped, overshoot);

        // The regular full chain is one step shorter than the cap.
        let mut addr = Address::new();
        let full = gen_chain(&input, 0, params.wots_w as u32 - 1, &ctx, &mut addr, &params);
        assert_ne!(full, capped);
    }

    #[test]
    fn test_expand_seed_distinct_chains() {
        let (params, _, _) = setup();
        let seed = vec![1u8; params.n];
        let expanded = expand_seed(&seed, &params);
        assert_eq!(expanded.len(), params.wots_len * params.n);
        assert_ne!(&expanded[..params.n], &expanded[params.n..2 * params.n]);
    }
}
