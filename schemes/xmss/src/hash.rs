//! Tweakable hash layer (RFC 8391 section 5).
//!
//! Every construction prepends an n-byte domain separator to the hash input:
//!
//! - `F`:    toByte(0, n) || key || (input XOR mask)
//! - `H`:    toByte(1, n) || key || (input XOR mask), 2n-byte input
//! - `H_msg`: toByte(2, n) || R || root || toByte(idx, n) || message
//! - `PRF`:  toByte(3, n) || key || 32-byte input
//!
//! Keys and bitmasks for `F` and `H` are derived with `PRF` keyed by the
//! public seed, evaluated at the address with the key-and-mask word set to
//! 0, 1 or 2.
//!
//! Almost every `PRF` call during keygen and signing is keyed by the same
//! public seed, and the separator-plus-seed prefix fills exactly one SHA-256
//! block. [`HashCtx`] absorbs that prefix once per operation and hands out
//! clones of the midstate, saving a compression call per `PRF` invocation.
//! The context is owned by the caller and only borrowed immutably, so
//! concurrent operations on distinct keys never share state.

use crate::address::Address;
use crate::params::{HashFunc, Params};
use crate::utils::ull_to_bytes;
use sha2::{Digest, Sha256};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake128,
};

const PADDING_F: u64 = 0;
const PADDING_H: u64 = 1;
const PADDING_HASH: u64 = 2;
const PADDING_PRF: u64 = 3;

#[derive(Clone)]
enum CoreState {
    Sha2(Sha256),
    Shake(Shake128),
}

/// Per-operation hash context caching the PRF prefix for one public seed.
pub struct HashCtx {
    state: CoreState,
    n: usize,
}

impl HashCtx {
    /// Absorbs `toByte(3, n) || pub_seed` into a reusable midstate.
    pub fn new(pub_seed: &[u8], params: &Params) -> Self {
        let mut prefix = vec![0u8; 2 * params.n];
        ull_to_bytes(&mut prefix[..params.n], PADDING_PRF);
        prefix[params.n..].copy_from_slice(pub_seed);

        let state = match params.func {
            HashFunc::Sha2 => {
                let mut hasher = Sha256::new();
                Digest::update(&mut hasher, &prefix);
                CoreState::Sha2(hasher)
            }
            HashFunc::Shake => {
                let mut hasher = Shake128::default();
                hasher.update(&prefix);
                CoreState::Shake(hasher)
            }
        };
        HashCtx { state, n: params.n }
    }

    /// PRF keyed by the public seed, over a 32-byte input (an address or a
    /// chain counter). Clones the cached midstate instead of reprocessing
    /// the prefix.
    pub fn prf(&self, input: &[u8; 32]) -> Vec<u8> {
        match &self.state {
            CoreState::Sha2(midstate) => {
                let mut hasher = midstate.clone();
                Digest::update(&mut hasher, input);
                hasher.finalize().to_vec()
            }
            CoreState::Shake(midstate) => {
                let mut hasher = midstate.clone();
                hasher.update(input);
                let mut out = vec![0u8; self.n];
                hasher.finalize_xof().read(&mut out);
                out
            }
        }
    }
}

/// One call of the underlying hash function with n bytes of output.
fn core_hash(input: &[u8], params: &Params) -> Vec<u8> {
    match params.func {
        HashFunc::Sha2 => {
            let mut hasher = Sha256::new();
            Digest::update(&mut hasher, input);
            hasher.finalize().to_vec()
        }
        HashFunc::Shake => {
            let mut hasher = Shake128::default();
            hasher.update(input);
            let mut out = vec![0u8; params.n];
            hasher.finalize_xof().read(&mut out);
            out
        }
    }
}

/// PRF with an arbitrary n-byte key (sk_seed, sk_prf or a WOTS+ seed) over
/// a 32-byte input.
pub fn prf(key: &[u8], input: &[u8; 32], params: &Params) -> Vec<u8> {
    let mut buf = vec![0u8; 2 * params.n + 32];
    ull_to_bytes(&mut buf[..params.n], PADDING_PRF);
    buf[params.n..2 * params.n].copy_from_slice(key);
    buf[2 * params.n..].copy_from_slice(input);
    core_hash(&buf, params)
}

/// Tweakable hash `F` for WOTS+ chains: one n-byte input, one n-byte mask.
pub fn thash_f(input: &[u8], ctx: &HashCtx, addr: &mut Address, params: &Params) -> Vec<u8> {
    let n = params.n;
    let mut buf = vec![0u8; 3 * n];
    ull_to_bytes(&mut buf[..n], PADDING_F);

    addr.set_key_and_mask(0);
    buf[n..2 * n].copy_from_slice(&ctx.prf(addr.as_bytes()));

    addr.set_key_and_mask(1);
    let bitmask = ctx.prf(addr.as_bytes());
    for i in 0..n {
        buf[2 * n + i] = input[i] ^ bitmask[i];
    }
    core_hash(&buf, params)
}

/// Tweakable hash `H` for tree nodes: 2n-byte input, 2n-byte mask.
///
/// The left child occupies `input[..n]`, the right child `input[n..2n]`.
pub fn thash_h(input: &[u8], ctx: &HashCtx, addr: &mut Address, params: &Params) -> Vec<u8> {
    let n = params.n;
    let mut buf = vec![0u8; 4 * n];
    ull_to_bytes(&mut buf[..n], PADDING_H);

    addr.set_key_and_mask(0);
    buf[n..2 * n].copy_from_slice(&ctx.prf(addr.as_bytes()));

    addr.set_key_and_mask(1);
    let bitmask_l = ctx.prf(addr.as_bytes());
    addr.set_key_and_mask(2);
    let bitmask_r = ctx.prf(addr.as_bytes());

    for i in 0..n {
        buf[2 * n + i] = input[i] ^ bitmask_l[i];
        buf[3 * n + i] = input[n + i] ^ bitmask_r[i];
    }
    core_hash(&buf, params)
}

/// Randomized message hash `H_msg`.
///
/// The prefix and the message are streamed into the digest, so the message
/// does not have to be copied into a prefixed buffer first.
pub fn hash_message(
    r: &[u8],
    root: &[u8],
    idx: u64,
    message: &[u8],
    params: &Params,
) -> Vec<u8> {
    let n = params.n;
    let mut prefix = vec![0u8; 4 * n];
    ull_to_bytes(&mut prefix[..n], PADDING_HASH);
    prefix[n..2 * n].copy_from_slice(r);
    prefix[2 * n..3 * n].copy_from_slice(root);
    ull_to_bytes(&mut prefix[3 * n..4 * n], idx);

    match params.func {
        HashFunc::Sha2 => {
            let mut hasher = Sha256::new();
            Digest::update(&mut hasher, &prefix);
            Digest::update(&mut hasher, message);
            hasher.finalize().to_vec()
        }
        HashFunc::Shake => {
            let mut hasher = Shake128::default();
            hasher.update(&prefix);
            hasher.update(message);
            let mut out = vec![0u8; n];
            hasher.finalize_xof().read(&mut out);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressType;

    fn test_params(func: HashFunc) -> Params {
        Params::new(func, 32, 10, 1, 16, 0).unwrap()
    }

    #[test]
    fn test_ctx_prf_matches_generic_prf() {
        for func in [HashFunc::Sha2, HashFunc::Shake] {
            let params = test_params(func);
            let pub_seed = vec![0xa5u8; params.n];
            let ctx = HashCtx::new(&pub_seed, &params);

            let mut addr = Address::new();
            addr.set_type(AddressType::Ots);
            addr.set_ots(12);
            addr.set_chain(3);
            addr.set_hash(7);

            assert_eq!(ctx.prf(addr.as_bytes()), prf(&pub_seed, addr.as_bytes(), &params));
        }
    }

    #[test]
    fn test_prf_output_size_and_determinism() {
        let params = test_params(HashFunc::Sha2);
        let key = vec![1u8; params.n];
        let input = [2u8; 32];

        let out1 = prf(&key, &input, &params);
        let out2 = prf(&key, &input, &params);
        assert_eq!(out1.len(), params.n);
        assert_eq!(out1, out2);

        let other = prf(&vec![3u8; params.n], &input, &params);
        assert_ne!(out1, other);
    }

    #[test]
    fn test_sha2_and_shake_disagree() {
        let key = vec![0u8; 32];
        let input = [0u8; 32];
        let sha2 = prf(&key, &input, &test_params(HashFunc::Sha2));
        let shake = prf(&key, &input, &test_params(HashFunc::Shake));
        assert_ne!(sha2, shake);
    }

    #[test]
    fn test_thash_f_depends_on_address() {
        let params = test_params(HashFunc::Sha2);
        let ctx = HashCtx::new(&vec![7u8; params.n], &params);
        let input = vec![0x11u8; params.n];

        let mut addr1 = Address::new();
        addr1.set_hash(0);
        let mut addr2 = Address::new();
        addr2.set_hash(1);

        let out1 = thash_f(&input, &ctx, &mut addr1, &params);
        let out2 = thash_f(&input, &ctx, &mut addr2, &params);
        assert_eq!(out1.len(), params.n);
        assert_ne!(out1, out2);
    }

    #[test]
    fn test_thash_h_left_right_asymmetry() {
        let params = test_params(HashFunc::Sha2);
        let ctx = HashCtx::new(&vec![7u8; params.n], &params);

        let mut input = vec![0u8; 2 * params.n];
        input[..params.n].fill(0xaa);
        input[params.n..].fill(0xbb);
        let mut swapped = vec![0u8; 2 * params.n];
        swapped[..params.n].fill(0xbb);
        swapped[params.n..].fill(0xaa);

        let mut addr = Address::new();
        let out = thash_h(&input, &ctx, &mut addr, &params);
        let mut addr = Address::new();
        let out_swapped = thash_h(&swapped, &ctx, &mut addr, &params);
        assert_ne!(out, out_swapped);
    }

    #[test]
    fn test_hash_message_binds_index() {
        let params = test_params(HashFunc::Sha2);
        let r = vec![1u8; params.n];
        let root = vec![2u8; params.n];
        let msg = b"the message being signed";

        let h0 = hash_message(&r, &root, 0, msg, &params);
        let h1 = hash_message(&r, &root, 1, msg, &params);
        assert_eq!(h0.len(), params.n);
        assert_ne!(h0, h1);
    }
}
