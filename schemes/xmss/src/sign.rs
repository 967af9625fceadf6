//! Signing and the signature container.
//!
//! Each call consumes one one-time index, emits the WOTS+ signature and
//! authentication path for every hypertree layer, and then spends a fixed
//! budget of (tree_height - bds_k) / 2 leaf computations advancing the BDS
//! traversal state so the next authentication path is ready. When a subtree
//! is used up, the prebuilt NEXT tree is swapped in and its root is signed
//! into the cached chain of WOTS+ signatures.
//!
//! A signature transports the signed message alongside the signature proper,
//! so the byte encoding is `idx || R || d * (wots_sig || auth) || message`.

use crate::address::{Address, AddressType};
use crate::bds::{bds_round, bds_state_update, bds_treehash_update};
use crate::error::{Result, XmssError};
use crate::hash::{hash_message, prf, HashCtx};
use crate::keygen::SecretKey;
use crate::merkle::get_seed;
use crate::params::Params;
use crate::utils::{bytes_to_ull, ull_to_bytes};
use crate::wots::wots_sign;

/// One hypertree layer of a signature: the WOTS+ signature on the node
/// below and the authentication path through this layer's subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSig {
    /// WOTS+ signature (wots_len * n bytes).
    pub wots_sig: Vec<u8>,
    /// Authentication path (tree_height * n bytes).
    pub auth: Vec<u8>,
}

/// An XMSS or XMSS^MT signature together with the signed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// One-time index this signature was made with.
    pub index: u64,
    /// Message randomizer R (n bytes).
    pub r: Vec<u8>,
    /// Per-layer WOTS+ signatures and authentication paths, bottom first.
    pub layers: Vec<LayerSig>,
    /// The signed message.
    pub message: Vec<u8>,
}

impl Signature {
    /// Serializes the signature: idx || R || layers || message.
    pub fn to_bytes(&self, params: &Params) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(params.sig_bytes + self.message.len());
        let mut idx = vec![0u8; params.index_bytes];
        ull_to_bytes(&mut idx, self.index);
        bytes.extend_from_slice(&idx);
        bytes.extend_from_slice(&self.r);
        for layer in &self.layers {
            bytes.extend_from_slice(&layer.wots_sig);
            bytes.extend_from_slice(&layer.auth);
        }
        bytes.extend_from_slice(&self.message);
        bytes
    }

    /// Deserializes a signature. Everything past the fixed-size signature
    /// part is taken as the message.
    pub fn from_bytes(bytes: &[u8], params: &Params) -> Result<Signature> {
        if bytes.len() < params.sig_bytes {
            return Err(XmssError::DecodingError {
                context: "truncated signature",
            });
        }
        let n = params.n;
        let mut pos = 0;

        let index = bytes_to_ull(&bytes[..params.index_bytes]);
        pos += params.index_bytes;
        let r = bytes[pos..pos + n].to_vec();
        pos += n;

        let mut layers = Vec::with_capacity(params.d);
        for _ in 0..params.d {
            let wots_sig = bytes[pos..pos + params.wots_sig_bytes].to_vec();
            pos += params.wots_sig_bytes;
            let auth = bytes[pos..pos + params.tree_height * n].to_vec();
            pos += params.tree_height * n;
            layers.push(LayerSig { wots_sig, auth });
        }

        Ok(Signature {
            index,
            r,
            layers,
            message: bytes[pos..].to_vec(),
        })
    }
}

/// Signs `message`, consuming one one-time index.
///
/// The secret key is mutated: the index advances and the traversal state
/// moves forward. Returns [`XmssError::KeyExhausted`] once all
/// 2^full_height indices have been used, leaving the key unchanged.
pub fn sign(sk: &mut SecretKey, message: &[u8]) -> Result<Signature> {
    let params = sk.params;
    let n = params.n;
    let h = params.tree_height;
    let d = params.d;
    let ctx = HashCtx::new(&sk.pub_seed, &params);

    let idx = sk.index;
    if idx >= 1u64 << params.full_height {
        return Err(XmssError::KeyExhausted);
    }
    sk.index = idx + 1;

    let mut idx_buf = [0u8; 32];
    ull_to_bytes(&mut idx_buf, idx);
    let r = prf(&sk.sk_prf, &idx_buf, &params);
    let msg_h = hash_message(&r, &sk.root, idx, message, &params);

    let mut idx_tree = idx >> h;
    let mut idx_leaf = (idx & ((1u64 << h) - 1)) as u32;

    let mut ots_addr = Address::new();
    ots_addr.set_type(AddressType::Ots);
    ots_addr.set_tree(idx_tree);
    ots_addr.set_ots(idx_leaf);

    // Bottom-layer WOTS+ signature; upper layers reuse the cached chain
    // signatures and the current authentication paths.
    let ots_seed = get_seed(&sk.sk_seed, &mut ots_addr, &params);
    let mut layers = Vec::with_capacity(d);
    layers.push(LayerSig {
        wots_sig: wots_sign(&msg_h, &ots_seed, &ctx, &mut ots_addr, &params),
        auth: sk.states[0].auth.clone(),
    });
    for i in 1..d {
        layers.push(LayerSig {
            wots_sig: sk.wots_sigs[i - 1].clone(),
            auth: sk.states[i].auth.clone(),
        });
    }

    // Advance the traversal state for the next index.
    let mut updates = ((h - params.bds_k) >> 1) as u32;
    let mut needswap_upto: i32 = -1;

    let mut addr = Address::new();
    addr.set_tree(idx_tree + 1);
    // The NEXT tree of the bottom layer grows by one leaf per signature;
    // this does not count against the update budget.
    if (1 + idx_tree) * (1u64 << h) + u64::from(idx_leaf) < 1u64 << params.full_height {
        bds_state_update(&mut sk.states[d], &sk.sk_seed, &ctx, &addr, &params);
    }

    for i in 0..d {
        if (idx + 1) & ((1u64 << ((i + 1) * h)) - 1) != 0 {
            // Not at the end of this layer's subtree.
            idx_leaf = ((idx >> (h * i)) & ((1u64 << h) - 1)) as u32;
            idx_tree = idx >> (h * (i + 1));
            addr.set_layer(i as u32);
            addr.set_tree(idx_tree);
            if i as i32 == needswap_upto + 1 {
                bds_round(&mut sk.states[i], idx_leaf, &sk.sk_seed, &ctx, &addr, &params);
            }
            updates =
                bds_treehash_update(&mut sk.states[i], updates, &sk.sk_seed, &ctx, &addr, &params);
            addr.set_tree(idx_tree + 1);
            // Spend leftover budget on this layer's NEXT tree, if one
            // exists and is still incomplete. A completed NEXT tree must
            // not consume the unit: the layers above depend on it.
            if (1 + idx_tree) * (1u64 << h) + u64::from(idx_leaf)
                < 1u64 << (params.full_height - h * i)
            {
                if i > 0 && updates > 0 && u64::from(sk.states[d + i].next_leaf) < 1u64 << h {
                    bds_state_update(&mut sk.states[d + i], &sk.sk_seed, &ctx, &addr, &params);
                    updates -= 1;
                }
            }
        } else if idx < (1u64 << params.full_height) - 1 {
            // This layer's subtree is used up: swap in the prebuilt NEXT
            // tree and sign its root with the next WOTS+ key one layer up.
            sk.states.swap(i, d + i);

            ots_addr.set_layer(i as u32 + 1);
            ots_addr.set_tree((idx + 1) >> ((i + 2) * h));
            ots_addr.set_ots((((idx >> ((i + 1) * h)) + 1) & ((1u64 << h) - 1)) as u32);

            let ots_seed = get_seed(&sk.sk_seed, &mut ots_addr, &params);
            let next_root = sk.states[i].stack[..n].to_vec();
            sk.wots_sigs[i] = wots_sign(&next_root, &ots_seed, &ctx, &mut ots_addr, &params);

            sk.states[d + i].stack_offset = 0;
            sk.states[d + i].next_leaf = 0;

            // The chain signature counts as one update. A rotation cascade
            // deeper than the remaining budget wraps the counter, granting
            // the layers above an effectively unbounded budget to finish
            // their treehash instances and NEXT trees in this call.
            updates = updates.wrapping_sub(1);
            needswap_upto = i as i32;
            for slot in sk.states[i].treehash.iter_mut() {
                slot.completed = true;
            }
        }
    }

    Ok(Signature {
        index: idx,
        r,
        layers,
        message: message.to_vec(),
    })
}
