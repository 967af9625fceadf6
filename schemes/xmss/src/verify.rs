//! Signature verification.
//!
//! Verification is stateless: it recomputes the randomized message digest,
//! walks every hypertree layer (WOTS+ public key recovery, L-tree, root
//! reconstruction along the authentication path) and compares the final
//! root to the public key.

use crate::address::{Address, AddressType};
use crate::error::{Result, XmssError};
use crate::hash::{hash_message, HashCtx};
use crate::keygen::PublicKey;
use crate::merkle::{compute_root, l_tree};
use crate::sign::Signature;
use crate::wots::wots_pk_from_sig;

/// Verifies `sig` under `pk` and returns the signed message.
///
/// Nothing about the message is released on failure.
pub fn verify(pk: &PublicKey, sig: &Signature) -> Result<Vec<u8>> {
    let params = pk.params;
    if sig.layers.len() != params.d {
        return Err(XmssError::InvalidSignature);
    }
    for layer in &sig.layers {
        if layer.wots_sig.len() != params.wots_sig_bytes
            || layer.auth.len() != params.tree_height * params.n
        {
            return Err(XmssError::InvalidSignature);
        }
    }

    let ctx = HashCtx::new(&pk.pub_seed, &params);
    let mut root = hash_message(&sig.r, &pk.root, sig.index, &sig.message, &params);

    let mut idx = sig.index;
    for (i, layer) in sig.layers.iter().enumerate() {
        let idx_leaf = (idx & ((1u64 << params.tree_height) - 1)) as u32;
        idx >>= params.tree_height;

        let mut ots_addr = Address::new();
        ots_addr.set_type(AddressType::Ots);
        ots_addr.set_layer(i as u32);
        ots_addr.set_tree(idx);
        ots_addr.set_ots(idx_leaf);

        let mut ltree_addr = Address::new();
        ltree_addr.set_type(AddressType::LTree);
        ltree_addr.set_layer(i as u32);
        ltree_addr.set_tree(idx);
        ltree_addr.set_ltree(idx_leaf);

        let mut node_addr = Address::new();
        node_addr.set_type(AddressType::HashTree);
        node_addr.set_layer(i as u32);
        node_addr.set_tree(idx);

        let mut wots_pk = wots_pk_from_sig(&layer.wots_sig, &root, &ctx, &mut ots_addr, &params);
        let leaf = l_tree(&mut wots_pk, &ctx, &mut ltree_addr, &params);
        root = compute_root(&leaf, idx_leaf, &layer.auth, &ctx, &mut node_addr, &params);
    }

    if root != pk.root {
        return Err(XmssError::InvalidSignature);
    }
    Ok(sig.message.clone())
}

/// Convenience wrapper returning a plain boolean.
pub fn verify_bool(pk: &PublicKey, sig: &Signature) -> bool {
    verify(pk, sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::keygen;
    use crate::params::{HashFunc, Params};
    use crate::sign::sign;
    use rand::rngs::OsRng;

    fn toy_params(full_height: usize, d: usize) -> Params {
        Params::new(HashFunc::Sha2, 32, full_height, d, 16, 0).unwrap()
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        for d in [1, 2] {
            let params = toy_params(4, d);
            let (pk, mut sk) = keygen(&mut OsRng, params);
            let sig = sign(&mut sk, b"hello xmss").unwrap();
            assert_eq!(verify(&pk, &sig).unwrap(), b"hello xmss");
        }
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let params = toy_params(4, 1);
        let (pk, mut sk) = keygen(&mut OsRng, params);
        let mut sig = sign(&mut sk, b"original").unwrap();
        sig.message = b"altered!".to_vec();
        assert!(matches!(verify(&pk, &sig), Err(XmssError::InvalidSignature)));
    }

    #[test]
    fn test_verify_rejects_wrong_index() {
        let params = toy_params(4, 1);
        let (pk, mut sk) = keygen(&mut OsRng, params);
        let mut sig = sign(&mut sk, b"msg").unwrap();
        sig.index = 1;
        assert!(!verify_bool(&pk, &sig));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let params = toy_params(4, 1);
        let (_, mut sk) = keygen(&mut OsRng, params);
        let (other_pk, _) = keygen(&mut OsRng, params);
        let sig = sign(&mut sk, b"msg").unwrap();
        assert!(!verify_bool(&other_pk, &sig));
    }

    #[test]
    fn test_verify_rejects_malformed_layers() {
        let params = toy_params(4, 2);
        let (pk, mut sk) = keygen(&mut OsRng, params);
        let mut sig = sign(&mut sk, b"msg").unwrap();
        sig.layers.pop();
        assert!(!verify_bool(&pk, &sig));
    }
}
