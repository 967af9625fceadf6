//! Key generation for XMSS and XMSS^MT.
//!
//! # Key structure
//!
//! - **Public key**: root || pub_seed (2n bytes)
//! - **Secret key**: idx || sk_seed || sk_prf || root || pub_seed, followed
//!   by the serialized BDS traversal states (one per layer plus one NEXT
//!   state per layer below the top) and, for d > 1, the cached WOTS+
//!   signatures chaining each layer root into the layer above.
//!
//! The secret key is a live object: every signature advances the index and
//! the traversal state. Callers that persist keys must write the updated
//! blob back after each signature, before releasing it.

use crate::address::Address;
use crate::bds::{treehash_init, BdsState};
use crate::error::{Result, XmssError};
use crate::hash::HashCtx;
use crate::merkle::get_seed;
use crate::params::Params;
use crate::utils::{bytes_to_ull, ull_to_bytes};
use crate::wots::wots_sign;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// XMSS public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// Root of the top subtree (n bytes).
    pub root: Vec<u8>,
    /// Public seed for keys and bitmasks (n bytes).
    pub pub_seed: Vec<u8>,
    /// Parameter set.
    pub params: Params,
}

impl PublicKey {
    /// Serializes the public key: root || pub_seed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.params.pk_bytes);
        bytes.extend_from_slice(&self.root);
        bytes.extend_from_slice(&self.pub_seed);
        bytes
    }

    /// Deserializes a public key.
    pub fn from_bytes(bytes: &[u8], params: Params) -> Result<Self> {
        if bytes.len() != params.pk_bytes {
            return Err(XmssError::InvalidKey {
                reason: "public key has wrong length",
            });
        }
        Ok(PublicKey {
            root: bytes[..params.n].to_vec(),
            pub_seed: bytes[params.n..2 * params.n].to_vec(),
            params,
        })
    }
}

/// XMSS secret key, including the one-time index and the BDS traversal
/// state for every layer.
///
/// # Security
///
/// Seed material is zeroized on drop. Reusing an index forfeits all
/// security guarantees; [`crate::sign::sign`] advances the index before
/// doing anything else and refuses exhausted keys.
#[derive(Clone, Debug)]
pub struct SecretKey {
    /// Next unused one-time signature index.
    pub index: u64,
    /// Secret seed all WOTS+ keys are derived from (n bytes).
    pub sk_seed: Vec<u8>,
    /// Secret PRF key for the message randomizer (n bytes).
    pub sk_prf: Vec<u8>,
    /// Copy of the public root (n bytes).
    pub root: Vec<u8>,
    /// Copy of the public seed (n bytes).
    pub pub_seed: Vec<u8>,
    /// BDS states: one per layer for the trees in use, then one per layer
    /// below the top for the NEXT trees being built (2d - 1 total).
    pub states: Vec<BdsState>,
    /// Cached WOTS+ signatures of each layer root under the layer above
    /// (d - 1 entries).
    pub wots_sigs: Vec<Vec<u8>>,
    /// Parameter set.
    pub params: Params,
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.sk_seed.zeroize();
        self.sk_prf.zeroize();
        for state in &mut self.states {
            state.stack.zeroize();
        }
    }
}

impl SecretKey {
    /// Serializes the secret key blob, traversal state included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.params.sk_bytes);
        let mut idx = vec![0u8; self.params.index_bytes];
        ull_to_bytes(&mut idx, self.index);
        bytes.extend_from_slice(&idx);
        bytes.extend_from_slice(&self.sk_seed);
        bytes.extend_from_slice(&self.sk_prf);
        bytes.extend_from_slice(&self.root);
        bytes.extend_from_slice(&self.pub_seed);
        for state in &self.states {
            state.serialize_into(&mut bytes);
        }
        for sig in &self.wots_sigs {
            bytes.extend_from_slice(sig);
        }
        bytes
    }

    /// Deserializes a secret key blob produced by [`SecretKey::to_bytes`].
    pub fn from_bytes(bytes: &[u8], params: Params) -> Result<Self> {
        if bytes.len() != params.sk_bytes {
            return Err(XmssError::InvalidKey {
                reason: "secret key has wrong length",
            });
        }
        let n = params.n;
        let mut pos = 0;

        let index = bytes_to_ull(&bytes[..params.index_bytes]);
        pos += params.index_bytes;
        let sk_seed = bytes[pos..pos + n].to_vec();
        pos += n;
        let sk_prf = bytes[pos..pos + n].to_vec();
        pos += n;
        let root = bytes[pos..pos + n].to_vec();
        pos += n;
        let pub_seed = bytes[pos..pos + n].to_vec();
        pos += n;

        let state_len = BdsState::serialized_len(&params);
        let mut states = Vec::with_capacity(2 * params.d - 1);
        for _ in 0..2 * params.d - 1 {
            states.push(BdsState::deserialize(&bytes[pos..], &params)?);
            pos += state_len;
        }

        let mut wots_sigs = Vec::with_capacity(params.d - 1);
        for _ in 0..params.d - 1 {
            wots_sigs.push(bytes[pos..pos + params.wots_sig_bytes].to_vec());
            pos += params.wots_sig_bytes;
        }

        Ok(SecretKey {
            index,
            sk_seed,
            sk_prf,
            root,
            pub_seed,
            states,
            wots_sigs,
            params,
        })
    }

    /// Returns the public key corresponding to this secret key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            root: self.root.clone(),
            pub_seed: self.pub_seed.clone(),
            params: self.params,
        }
    }

    /// Number of signatures this key can still produce.
    pub fn remaining_signatures(&self) -> u64 {
        (1u64 << self.params.full_height) - self.index
    }
}

/// Generates an XMSS or XMSS^MT key pair.
///
/// Key generation builds the bottom-layer subtree in full (2^tree_height
/// leaves), derives every higher layer from the root below it and caches
/// the chaining WOTS+ signatures, so this is by far the most expensive
/// operation of the scheme.
pub fn keygen<R: RngCore + CryptoRng>(rng: &mut R, params: Params) -> (PublicKey, SecretKey) {
    let mut sk_seed = vec![0u8; params.n];
    let mut sk_prf = vec![0u8; params.n];
    let mut pub_seed = vec![0u8; params.n];

    rng.fill_bytes(&mut sk_seed);
    rng.fill_bytes(&mut sk_prf);
    rng.fill_bytes(&mut pub_seed);

    let pair = keygen_internal(&sk_seed, &sk_prf, &pub_seed, params);
    sk_seed.zeroize();
    sk_prf.zeroize();
    pair
}

/// Deterministic key generation from seeds.
pub fn keygen_internal(
    sk_seed: &[u8],
    sk_prf: &[u8],
    pub_seed: &[u8],
    params: Params,
) -> (PublicKey, SecretKey) {
    let ctx = HashCtx::new(pub_seed, &params);
    let mut states: Vec<BdsState> = (0..2 * params.d - 1)
        .map(|_| BdsState::new(&params))
        .collect();
    let mut wots_sigs = Vec::with_capacity(params.d - 1);

    // Walk up the layers: build each subtree at leaf position 0 and sign
    // its root with the first WOTS+ key of the layer above.
    let mut addr = Address::new();
    let mut root;
    for i in 0..params.d - 1 {
        root = treehash_init(
            &mut states[i],
            params.tree_height,
            0,
            sk_seed,
            &ctx,
            &addr,
            &params,
        );
        addr.set_layer(i as u32 + 1);
        let ots_seed = get_seed(sk_seed, &mut addr, &params);
        wots_sigs.push(wots_sign(&root, &ots_seed, &ctx, &mut addr, &params));
    }
    root = treehash_init(
        &mut states[params.d - 1],
        params.tree_height,
        0,
        sk_seed,
        &ctx,
        &addr,
        &params,
    );

    let pk = PublicKey {
        root: root.clone(),
        pub_seed: pub_seed.to_vec(),
        params,
    };
    let sk = SecretKey {
        index: 0,
        sk_seed: sk_seed.to_vec(),
        sk_prf: sk_prf.to_vec(),
        root,
        pub_seed: pub_seed.to_vec(),
        states,
        wots_sigs,
        params,
    };
    (pk, sk)
}
