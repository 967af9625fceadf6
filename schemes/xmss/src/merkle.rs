//! L-trees and Merkle root computation (RFC 8391 section 4.1).
//!
//! An L-tree compresses the `len` chain ends of a WOTS+ public key into a
//! single n-byte leaf. `len` is not a power of two, so odd rows promote
//! their last node unchanged. [`compute_root`] walks a leaf up to the tree
//! root along an authentication path during verification.

use crate::address::{Address, AddressType};
use crate::hash::{prf, thash_h, HashCtx};
use crate::params::Params;
use crate::wots::wots_pkgen;

/// Compresses a WOTS+ public key into a leaf node. Consumes `wots_pk` as
/// scratch space.
pub fn l_tree(wots_pk: &mut [u8], ctx: &HashCtx, addr: &mut Address, params: &Params) -> Vec<u8> {
    let n = params.n;
    let mut l = params.wots_len;
    let mut height = 0u32;

    addr.set_tree_height(height);
    while l > 1 {
        let parent_nodes = l >> 1;
        for i in 0..parent_nodes {
            addr.set_tree_index(i as u32);
            let parent = thash_h(&wots_pk[2 * i * n..(2 * i + 2) * n], ctx, addr, params);
            wots_pk[i * n..(i + 1) * n].copy_from_slice(&parent);
        }
        // An odd row promotes its last node unchanged; no address is
        // consumed for it.
        if l & 1 == 1 {
            wots_pk.copy_within((l - 1) * n..l * n, (l >> 1) * n);
            l = (l >> 1) + 1;
        } else {
            l >>= 1;
        }
        height += 1;
        addr.set_tree_height(height);
    }
    wots_pk[..n].to_vec()
}

/// Recomputes the subtree root from a leaf, its index and an authentication
/// path of `tree_height` nodes.
pub fn compute_root(
    leaf: &[u8],
    leafidx: u32,
    auth_path: &[u8],
    ctx: &HashCtx,
    addr: &mut Address,
    params: &Params,
) -> Vec<u8> {
    let n = params.n;
    let mut idx = leafidx;
    let mut buffer = vec![0u8; 2 * n];

    // An odd leaf is a right child, so the auth node goes on the left.
    if idx & 1 == 1 {
        buffer[n..].copy_from_slice(&leaf[..n]);
        buffer[..n].copy_from_slice(&auth_path[..n]);
    } else {
        buffer[..n].copy_from_slice(&leaf[..n]);
        buffer[n..].copy_from_slice(&auth_path[..n]);
    }
    let mut auth = &auth_path[n..];

    for i in 0..params.tree_height - 1 {
        addr.set_tree_height(i as u32);
        idx >>= 1;
        addr.set_tree_index(idx);

        let parent = thash_h(&buffer, ctx, addr, params);
        if idx & 1 == 1 {
            buffer[n..].copy_from_slice(&parent);
            buffer[..n].copy_from_slice(&auth[..n]);
        } else {
            buffer[..n].copy_from_slice(&parent);
            buffer[n..].copy_from_slice(&auth[..n]);
        }
        auth = &auth[n..];
    }

    // The last hash has no auth node to merge in.
    addr.set_tree_height(params.tree_height as u32 - 1);
    idx >>= 1;
    addr.set_tree_index(idx);
    thash_h(&buffer, ctx, addr, params)
}

/// Derives the WOTS+ seed for the key pair at `addr`.
///
/// The chain, hash and key-and-mask words are zeroed first so that the seed
/// depends only on the key pair position.
pub fn get_seed(sk_seed: &[u8], addr: &mut Address, params: &Params) -> Vec<u8> {
    addr.set_chain(0);
    addr.set_hash(0);
    addr.set_key_and_mask(0);
    prf(sk_seed, addr.as_bytes(), params)
}

/// Computes the Merkle leaf at `ots_addr`: WOTS+ key generation followed by
/// L-tree compression.
pub fn gen_leaf_wots(
    sk_seed: &[u8],
    ctx: &HashCtx,
    ltree_addr: &mut Address,
    ots_addr: &mut Address,
    params: &Params,
) -> Vec<u8> {
    let seed = get_seed(sk_seed, ots_addr, params);
    let mut pk = wots_pkgen(&seed, ctx, ots_addr, params);
    l_tree(&mut pk, ctx, ltree_addr, params)
}

/// Sets up the OTS, L-tree and hash-tree addresses for one subtree,
/// inheriting layer and tree position from `addr`.
pub fn subtree_addrs(addr: &Address) -> (Address, Address, Address) {
    let mut ots_addr = addr.subtree();
    ots_addr.set_type(AddressType::Ots);
    let mut ltree_addr = addr.subtree();
    ltree_addr.set_type(AddressType::LTree);
    let mut node_addr = addr.subtree();
    node_addr.set_type(AddressType::HashTree);
    (ots_addr, ltree_addr, node_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HashFunc;

    fn setup() -> (Params, HashCtx) {
        let params = Params::new(HashFunc::Sha2, 32, 4, 1, 16, 0).unwrap();
        let ctx = HashCtx::new(&vec![0x55u8; params.n], &params);
        (params, ctx)
    }

    /// Reference pairwise reduction with explicit odd-node promotion.
    fn l_tree_reference(
        nodes: &[Vec<u8>],
        ctx: &HashCtx,
        addr: &mut Address,
        params: &Params,
    ) -> Vec<u8> {
        let mut row: Vec<Vec<u8>> = nodes.to_vec();
        let mut height = 0u32;
        while row.len() > 1 {
            addr.set_tree_height(height);
            let mut next = Vec::new();
            for (i, pair) in row.chunks(2).enumerate() {
                if pair.len() == 2 {
                    addr.set_tree_index(i as u32);
                    let mut buf = pair[0].clone();
                    buf.extend_from_slice(&pair[1]);
                    next.push(thash_h(&buf, ctx, addr, params));
                } else {
                    next.push(pair[0].clone());
                }
            }
            row = next;
            height += 1;
        }
        row.pop().unwrap()
    }

    #[test]
    fn test_l_tree_matches_reference() {
        let (params, ctx) = setup();
        let nodes: Vec<Vec<u8>> = (0..params.wots_len)
            .map(|i| vec![i as u8; params.n])
            .collect();
        let mut flat: Vec<u8> = nodes.iter().flatten().copied().collect();

        let mut addr = Address::new();
        addr.set_type(AddressType::LTree);
        addr.set_ltree(3);
        let leaf = l_tree(&mut flat, &ctx, &mut addr, &params);

        let mut addr = Address::new();
        addr.set_type(AddressType::LTree);
        addr.set_ltree(3);
        let expected = l_tree_reference(&nodes, &ctx, &mut addr, &params);
        assert_eq!(leaf, expected);
    }

    #[test]
    fn test_compute_root_h2() {
        // Build a height-2 tree by hand and check every leaf against its
        // auth path.
        let params = Params::new(HashFunc::Sha2, 32, 2, 1, 16, 0).unwrap();
        let ctx = HashCtx::new(&vec![0x55u8; params.n], &params);
        let leaves: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; params.n]).collect();

        let node = |height: u32, index: u32, input: &[u8]| {
            let mut addr = Address::new();
            addr.set_type(AddressType::HashTree);
            addr.set_tree_height(height);
            addr.set_tree_index(index);
            thash_h(input, &ctx, &mut addr, &params)
        };

        let mut buf = leaves[0].clone();
        buf.extend_from_slice(&leaves[1]);
        let n01 = node(0, 0, &buf);
        let mut buf = leaves[2].clone();
        buf.extend_from_slice(&leaves[3]);
        let n23 = node(0, 1, &buf);
        let mut buf = n01.clone();
        buf.extend_from_slice(&n23);
        let root = node(1, 0, &buf);

        let auth_for = |idx: usize| -> Vec<u8> {
            let mut auth = leaves[idx ^ 1].clone();
            auth.extend_from_slice(if idx < 2 { &n23 } else { &n01 });
            auth
        };

        for idx in 0..4 {
            let mut addr = Address::new();
            addr.set_type(AddressType::HashTree);
            let computed = compute_root(
                &leaves[idx],
                idx as u32,
                &auth_for(idx),
                &ctx,
                &mut addr,
                &params,
            );
            assert_eq!(computed, root, "leaf {}", idx);
        }
    }

    #[test]
    fn test_get_seed_ignores_chain_state() {
        let (params, _) = setup();
        let sk_seed = vec![9u8; params.n];

        let mut addr1 = Address::new();
        addr1.set_ots(4);
        let mut addr2 = Address::new();
        addr2.set_ots(4);
        addr2.set_chain(11);
        addr2.set_hash(2);
        addr2.set_key_and_mask(1);

        assert_eq!(
            get_seed(&sk_seed, &mut addr1, &params),
            get_seed(&sk_seed, &mut addr2, &params)
        );
    }

    #[test]
    fn test_gen_leaf_distinct_positions() {
        let (params, ctx) = setup();
        let sk_seed = vec![3u8; params.n];

        let leaf_at = |idx: u32| {
            let base = Address::new();
            let (mut ots, mut ltree, _) = subtree_addrs(&base);
            ots.set_ots(idx);
            ltree.set_ltree(idx);
            gen_leaf_wots(&sk_seed, &ctx, &mut ltree, &mut ots, &params)
        };

        assert_ne!(leaf_at(0), leaf_at(1));
        assert_eq!(leaf_at(2), leaf_at(2));
    }
}
