//! BDS tree traversal (Buchmann, Dahmen, Szydlo: "Merkle Tree Traversal
//! Revisited", in Post-Quantum Cryptography, Springer 2008).
//!
//! Recomputing a fresh authentication path for every signature costs a full
//! subtree build. The BDS algorithm amortizes that cost: the state carries
//! the current authentication path, one incremental treehash instance per
//! tree level, a shared node stack, "keep" nodes for upcoming left-node
//! reuse and, for nonzero `bds_k`, the retained right nodes of the top k
//! levels. Each signature performs a bounded number of leaf computations
//! ([`bds_treehash_update`] with a budget of `(h - k) / 2`) and leaves the
//! state ready for the next index.
//!
//! For XMSS^MT, every layer keeps one state for the tree currently in use
//! and one for the NEXT tree being built in the background
//! ([`bds_state_update`]); the two are swapped when a layer rolls over to a
//! fresh subtree.
//!
//! All buffers are owned and heap-backed, sized from the runtime
//! parameters. The byte layout of the persisted secret key is produced by
//! [`BdsState::serialize_into`], not by the in-memory representation.

use crate::address::Address;
use crate::error::{Result, XmssError};
use crate::hash::{thash_h, HashCtx};
use crate::merkle::{gen_leaf_wots, subtree_addrs};
use crate::params::Params;
use crate::utils::bytes_to_ull;

/// One incremental treehash instance, producing the next node the
/// authentication path will need at its level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreehashSlot {
    /// Target node height.
    pub height: u8,
    /// Next leaf this instance will consume.
    pub next_idx: u32,
    /// Number of stack entries owned by this instance.
    pub stack_usage: u8,
    /// Set once the target node has been produced.
    pub completed: bool,
    /// The produced node.
    pub node: Vec<u8>,
}

/// Traversal state for one subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BdsState {
    /// Shared node stack, `(tree_height + 1) * n` bytes.
    pub stack: Vec<u8>,
    /// Number of nodes currently on the stack.
    pub stack_offset: usize,
    /// Height of each stack entry.
    pub stack_levels: Vec<u8>,
    /// Current authentication path, `tree_height * n` bytes.
    pub auth: Vec<u8>,
    /// Saved left nodes for future authentication paths.
    pub keep: Vec<u8>,
    /// One treehash instance per level below `tree_height - bds_k`.
    pub treehash: Vec<TreehashSlot>,
    /// Retained right nodes of the top `bds_k` levels.
    pub retain: Vec<u8>,
    /// Next leaf to be absorbed when this state builds a NEXT tree.
    pub next_leaf: u32,
}

impl BdsState {
    /// Creates an empty state sized for `params`.
    pub fn new(params: &Params) -> Self {
        let n = params.n;
        let h = params.tree_height;
        let k = params.bds_k;
        BdsState {
            stack: vec![0u8; (h + 1) * n],
            stack_offset: 0,
            stack_levels: vec![0u8; h + 1],
            auth: vec![0u8; h * n],
            keep: vec![0u8; (h >> 1) * n],
            treehash: (0..h - k)
                .map(|j| TreehashSlot {
                    height: j as u8,
                    next_idx: 0,
                    stack_usage: 0,
                    completed: true,
                    node: vec![0u8; n],
                })
                .collect(),
            retain: vec![0u8; ((1 << k) - k - 1) * n],
            next_leaf: 0,
        }
    }

    /// Smallest height among the stack entries owned by the treehash
    /// instance at `level`.
    fn treehash_minheight_on_stack(&self, level: usize, params: &Params) -> u32 {
        let mut r = params.tree_height as u32;
        for i in 0..self.treehash[level].stack_usage as usize {
            let height = u32::from(self.stack_levels[self.stack_offset - i - 1]);
            if height < r {
                r = height;
            }
        }
        r
    }

    /// Serialized size of one state for `params`.
    pub fn serialized_len(params: &Params) -> usize {
        let n = params.n;
        let h = params.tree_height;
        let k = params.bds_k;
        (h + 1) * n + 4 + h + 1 + h * n + (h >> 1) * n + (h - k) * (7 + n)
            + ((1 << k) - k - 1) * n
            + 4
    }

    /// Appends the canonical byte layout of this state to `out`.
    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.stack);
        out.extend_from_slice(&(self.stack_offset as u32).to_be_bytes());
        out.extend_from_slice(&self.stack_levels);
        out.extend_from_slice(&self.auth);
        out.extend_from_slice(&self.keep);
        for slot in &self.treehash {
            out.push(slot.height);
            out.extend_from_slice(&slot.next_idx.to_be_bytes());
            out.push(slot.stack_usage);
            out.push(u8::from(slot.completed));
            out.extend_from_slice(&slot.node);
        }
        out.extend_from_slice(&self.retain);
        out.extend_from_slice(&self.next_leaf.to_be_bytes());
    }

    /// Parses one state from the front of `bytes`.
    pub fn deserialize(bytes: &[u8], params: &Params) -> Result<BdsState> {
        if bytes.len() < Self::serialized_len(params) {
            return Err(XmssError::DecodingError {
                context: "truncated BDS state",
            });
        }
        let n = params.n;
        let h = params.tree_height;
        let k = params.bds_k;
        let mut pos = 0;
        let mut take = |len: usize| {
            let slice = &bytes[pos..pos + len];
            pos += len;
            slice
        };

        let stack = take((h + 1) * n).to_vec();
        let stack_offset = bytes_to_ull(take(4)) as usize;
        let stack_levels = take(h + 1).to_vec();
        let auth = take(h * n).to_vec();
        let keep = take((h >> 1) * n).to_vec();
        let mut treehash = Vec::with_capacity(h - k);
        for _ in 0..h - k {
            let height = take(1)[0];
            let next_idx = bytes_to_ull(take(4)) as u32;
            let stack_usage = take(1)[0];
            let completed = take(1)[0] != 0;
            let node = take(n).to_vec();
            treehash.push(TreehashSlot {
                height,
                next_idx,
                stack_usage,
                completed,
                node,
            });
        }
        let retain = take(((1 << k) - k - 1) * n).to_vec();
        let next_leaf = bytes_to_ull(take(4)) as u32;

        if stack_offset > h + 1 {
            return Err(XmssError::DecodingError {
                context: "BDS stack offset out of range",
            });
        }
        // The treehash fields feed unchecked stack arithmetic during
        // signing, so a blob must keep them within the stack it ships.
        let usage: usize = treehash
            .iter()
            .map(|slot| usize::from(slot.stack_usage))
            .sum();
        if usage > stack_offset {
            return Err(XmssError::DecodingError {
                context: "BDS treehash stack usage exceeds stack",
            });
        }
        for (i, slot) in treehash.iter().enumerate() {
            if usize::from(slot.height) != i {
                return Err(XmssError::DecodingError {
                    context: "BDS treehash slot height out of place",
                });
            }
        }

        Ok(BdsState {
            stack,
            stack_offset,
            stack_levels,
            auth,
            keep,
            treehash,
            retain,
            next_leaf,
        })
    }
}

/// Routes a freshly produced right node into the auth path, a treehash slot
/// or the retain buffer, depending on its height and row position. Shared
/// by the full build and the incremental NEXT-tree build.
fn stash_right_node(
    state: &mut BdsState,
    leaf_counter: u32,
    nodeh: usize,
    node: &[u8],
    params: &Params,
) {
    let n = params.n;
    let h = params.tree_height;
    let hk = h - params.bds_k;
    let row = (leaf_counter as usize) >> nodeh;

    if row == 1 {
        state.auth[nodeh * n..(nodeh + 1) * n].copy_from_slice(node);
    } else if nodeh < hk && row == 3 {
        state.treehash[nodeh].node.copy_from_slice(node);
    } else if nodeh >= hk {
        let offset = (1usize << (h - 1 - nodeh)) + nodeh - h + ((row - 3) >> 1);
        state.retain[offset * n..(offset + 1) * n].copy_from_slice(node);
    }
}

/// Full treehash build of the subtree rooted above leaf `index` with the
/// given `height`, priming `state` for leaf 0 on the way: the first
/// authentication path, one node per treehash slot and the retained top
/// nodes. Returns the subtree root. Used at key generation.
pub fn treehash_init(
    state: &mut BdsState,
    height: usize,
    index: u32,
    sk_seed: &[u8],
    ctx: &HashCtx,
    addr: &Address,
    params: &Params,
) -> Vec<u8> {
    let n = params.n;
    let (mut ots_addr, mut ltree_addr, mut node_addr) = subtree_addrs(addr);

    for (j, slot) in state.treehash.iter_mut().enumerate() {
        slot.height = j as u8;
        slot.completed = true;
        slot.stack_usage = 0;
    }

    let mut stack = vec![0u8; (height + 1) * n];
    let mut stack_levels = vec![0u32; height + 1];
    let mut offset: usize = 0;

    for i in 0..1u32 << height {
        let idx = index + i;
        ltree_addr.set_ltree(idx);
        ots_addr.set_ots(idx);
        let leaf = gen_leaf_wots(sk_seed, ctx, &mut ltree_addr, &mut ots_addr, params);
        stack[offset * n..(offset + 1) * n].copy_from_slice(&leaf);
        stack_levels[offset] = 0;
        offset += 1;

        while offset > 1 && stack_levels[offset - 1] == stack_levels[offset - 2] {
            let nodeh = stack_levels[offset - 1] as usize;
            let node = stack[(offset - 1) * n..offset * n].to_vec();
            stash_right_node(state, i, nodeh, &node, params);

            node_addr.set_tree_height(stack_levels[offset - 1]);
            node_addr.set_tree_index(idx >> (stack_levels[offset - 1] + 1));
            let parent = thash_h(&stack[(offset - 2) * n..offset * n], ctx, &mut node_addr, params);
            stack[(offset - 2) * n..(offset - 1) * n].copy_from_slice(&parent);
            stack_levels[offset - 2] += 1;
            offset -= 1;
        }
    }
    stack[..n].to_vec()
}

/// One step of the treehash instance at `level`: generate its next leaf and
/// fold it into the shared stack, completing the instance when the target
/// height is reached.
pub fn treehash_update(
    state: &mut BdsState,
    level: usize,
    sk_seed: &[u8],
    ctx: &HashCtx,
    addr: &Address,
    params: &Params,
) {
    let n = params.n;
    let (mut ots_addr, mut ltree_addr, mut node_addr) = subtree_addrs(addr);
    let next_idx = state.treehash[level].next_idx;
    ltree_addr.set_ltree(next_idx);
    ots_addr.set_ots(next_idx);

    let mut node = gen_leaf_wots(sk_seed, ctx, &mut ltree_addr, &mut ots_addr, params);
    let mut node_height = 0u8;

    while state.treehash[level].stack_usage > 0
        && state.stack_levels[state.stack_offset - 1] == node_height
    {
        let top = state.stack_offset - 1;
        let mut buf = state.stack[top * n..(top + 1) * n].to_vec();
        buf.extend_from_slice(&node);

        node_addr.set_tree_height(u32::from(node_height));
        node_addr.set_tree_index(next_idx >> (node_height + 1));
        node = thash_h(&buf, ctx, &mut node_addr, params);

        node_height += 1;
        state.treehash[level].stack_usage -= 1;
        state.stack_offset -= 1;
    }

    if node_height == state.treehash[level].height {
        // stack_usage is necessarily zero here
        state.treehash[level].node.copy_from_slice(&node);
        state.treehash[level].completed = true;
    } else {
        let off = state.stack_offset;
        state.stack[off * n..(off + 1) * n].copy_from_slice(&node);
        state.treehash[level].stack_usage += 1;
        state.stack_levels[off] = node_height;
        state.stack_offset += 1;
        state.treehash[level].next_idx += 1;
    }
}

/// Spends up to `updates` treehash steps on the instance that needs them
/// most: the one whose lowest reachable node is lowest, ties broken towards
/// lower levels. Returns the unused budget.
pub fn bds_treehash_update(
    state: &mut BdsState,
    updates: u32,
    sk_seed: &[u8],
    ctx: &HashCtx,
    addr: &Address,
    params: &Params,
) -> u32 {
    let hk = params.tree_height - params.bds_k;
    let mut used = 0;

    for _ in 0..updates {
        let mut l_min = params.tree_height as u32;
        let mut level = hk;
        for i in 0..hk {
            let low = if state.treehash[i].completed {
                params.tree_height as u32
            } else if state.treehash[i].stack_usage == 0 {
                i as u32
            } else {
                state.treehash_minheight_on_stack(i, params)
            };
            if low < l_min {
                level = i;
                l_min = low;
            }
        }
        if level == hk {
            break;
        }
        treehash_update(state, level, sk_seed, ctx, addr, params);
        used += 1;
    }
    updates - used
}

/// Absorbs one leaf into a NEXT-tree state, folding the shared stack as in
/// the full build. Returns `false` once all `2^tree_height` leaves have
/// been processed.
pub fn bds_state_update(
    state: &mut BdsState,
    sk_seed: &[u8],
    ctx: &HashCtx,
    addr: &Address,
    params: &Params,
) -> bool {
    let n = params.n;
    let idx = state.next_leaf;
    if u64::from(idx) == 1u64 << params.tree_height {
        return false;
    }

    let (mut ots_addr, mut ltree_addr, mut node_addr) = subtree_addrs(addr);
    ots_addr.set_ots(idx);
    ltree_addr.set_ltree(idx);

    let leaf = gen_leaf_wots(sk_seed, ctx, &mut ltree_addr, &mut ots_addr, params);
    let off = state.stack_offset;
    state.stack[off * n..(off + 1) * n].copy_from_slice(&leaf);
    state.stack_levels[off] = 0;
    state.stack_offset += 1;

    while state.stack_offset > 1
        && state.stack_levels[state.stack_offset - 1] == state.stack_levels[state.stack_offset - 2]
    {
        let offset = state.stack_offset;
        let nodeh = state.stack_levels[offset - 1] as usize;
        let node = state.stack[(offset - 1) * n..offset * n].to_vec();
        stash_right_node(state, idx, nodeh, &node, params);

        node_addr.set_tree_height(u32::from(state.stack_levels[offset - 1]));
        node_addr.set_tree_index(idx >> (state.stack_levels[offset - 1] + 1));
        let parent = thash_h(
            &state.stack[(offset - 2) * n..offset * n],
            ctx,
            &mut node_addr,
            params,
        );
        state.stack[(offset - 2) * n..(offset - 1) * n].copy_from_slice(&parent);
        state.stack_levels[offset - 2] += 1;
        state.stack_offset -= 1;
    }
    state.next_leaf += 1;
    true
}

/// Advances the state past `leaf_idx`: rebuilds the authentication path for
/// the next leaf from the keep buffer, the completed treehash nodes and the
/// retained top nodes, then restarts the treehash instances that the step
/// invalidated.
pub fn bds_round(
    state: &mut BdsState,
    leaf_idx: u32,
    sk_seed: &[u8],
    ctx: &HashCtx,
    addr: &Address,
    params: &Params,
) {
    let n = params.n;
    let h = params.tree_height;
    let hk = h - params.bds_k;
    let (mut ots_addr, mut ltree_addr, mut node_addr) = subtree_addrs(addr);

    // tau: height of the first left-turn on the path from leaf_idx upward.
    let mut tau = h;
    for i in 0..h {
        if (u64::from(leaf_idx) >> i) & 1 == 0 {
            tau = i;
            break;
        }
    }

    let mut buf = vec![0u8; 2 * n];
    if tau > 0 {
        buf[..n].copy_from_slice(&state.auth[(tau - 1) * n..tau * n]);
        // must be read before the keep buffer is refreshed below
        let kk = (tau - 1) >> 1;
        buf[n..].copy_from_slice(&state.keep[kk * n..(kk + 1) * n]);
    }
    if (u64::from(leaf_idx) >> (tau + 1)) & 1 == 0 && tau < h - 1 {
        let kk = tau >> 1;
        state.keep[kk * n..(kk + 1) * n].copy_from_slice(&state.auth[tau * n..(tau + 1) * n]);
    }

    if tau == 0 {
        ltree_addr.set_ltree(leaf_idx);
        ots_addr.set_ots(leaf_idx);
        let leaf = gen_leaf_wots(sk_seed, ctx, &mut ltree_addr, &mut ots_addr, params);
        state.auth[..n].copy_from_slice(&leaf);
    } else {
        node_addr.set_tree_height(tau as u32 - 1);
        node_addr.set_tree_index(leaf_idx >> tau);
        let parent = thash_h(&buf, ctx, &mut node_addr, params);
        state.auth[tau * n..(tau + 1) * n].copy_from_slice(&parent);

        for i in 0..tau {
            if i < hk {
                let (auth, treehash) = (&mut state.auth, &state.treehash);
                auth[i * n..(i + 1) * n].copy_from_slice(&treehash[i].node);
            } else {
                let offset = (1usize << (h - 1 - i)) + i - h;
                let rowidx = (((leaf_idx as usize) >> i) - 1) >> 1;
                let (auth, retain) = (&mut state.auth, &state.retain);
                auth[i * n..(i + 1) * n]
                    .copy_from_slice(&retain[(offset + rowidx) * n..(offset + rowidx + 1) * n]);
            }
        }

        for i in 0..tau.min(hk) {
            let startidx = u64::from(leaf_idx) + 1 + 3 * (1u64 << i);
            if startidx < 1u64 << h {
                let slot = &mut state.treehash[i];
                slot.height = i as u8;
                slot.next_idx = startidx as u32;
                slot.completed = false;
                slot.stack_usage = 0;
            }
        }
    }
}
