//! Hash address (ADRS) structure for domain separation.
//!
//! Every hash call in XMSS is keyed by a 32-byte address that pins down
//! exactly where in the hypertree the call happens. The address is eight
//! big-endian 32-bit words (RFC 8391 section 2.5):
//!
//! ```text
//! Bytes 0-3:   Layer address
//! Bytes 4-11:  Tree address (64 bits)
//! Bytes 12-15: Type (OTS = 0, L-tree = 1, hash tree = 2)
//! Bytes 16-19: OTS address / L-tree address (padding for hash tree)
//! Bytes 20-23: Chain address / tree height
//! Bytes 24-27: Hash address / tree index
//! Bytes 28-31: Key-and-mask
//! ```
//!
//! Setting a field never implicitly clears any other field; callers that
//! need a clean slate zero the relevant fields explicitly. This matches the
//! behavior the interoperability test vectors were generated against.

/// Address types distinguishing the three hash domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum AddressType {
    /// WOTS+ chain computations.
    Ots = 0,
    /// L-tree compression of a WOTS+ public key.
    LTree = 1,
    /// Internal Merkle tree nodes.
    HashTree = 2,
}

/// ADRS structure (32 bytes) for domain separation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address {
    data: [u8; 32],
}

impl Default for Address {
    fn default() -> Self {
        Self::new()
    }
}

impl Address {
    /// Creates a new zeroed address.
    pub fn new() -> Self {
        Address { data: [0u8; 32] }
    }

    /// Sets the layer address (bytes 0-3). Layer 0 is the bottom of the
    /// hypertree.
    #[inline]
    pub fn set_layer(&mut self, layer: u32) {
        self.data[0..4].copy_from_slice(&layer.to_be_bytes());
    }

    /// Sets the tree address (bytes 4-11), identifying the subtree within
    /// the layer.
    #[inline]
    pub fn set_tree(&mut self, tree: u64) {
        self.data[4..12].copy_from_slice(&tree.to_be_bytes());
    }

    /// Sets the address type (bytes 12-15).
    #[inline]
    pub fn set_type(&mut self, addr_type: AddressType) {
        self.data[12..16].copy_from_slice(&(addr_type as u32).to_be_bytes());
    }

    /// Sets the OTS address (bytes 16-19): which WOTS+ key pair in the tree.
    #[inline]
    pub fn set_ots(&mut self, ots: u32) {
        self.data[16..20].copy_from_slice(&ots.to_be_bytes());
    }

    /// Sets the L-tree address (bytes 16-19): which leaf is being compressed.
    #[inline]
    pub fn set_ltree(&mut self, ltree: u32) {
        self.data[16..20].copy_from_slice(&ltree.to_be_bytes());
    }

    /// Sets the chain address (bytes 20-23): which WOTS+ chain.
    #[inline]
    pub fn set_chain(&mut self, chain: u32) {
        self.data[20..24].copy_from_slice(&chain.to_be_bytes());
    }

    /// Sets the tree height (bytes 20-23) for L-tree and hash tree nodes.
    #[inline]
    pub fn set_tree_height(&mut self, height: u32) {
        self.data[20..24].copy_from_slice(&height.to_be_bytes());
    }

    /// Sets the hash address (bytes 24-27): position within a WOTS+ chain.
    #[inline]
    pub fn set_hash(&mut self, hash: u32) {
        self.data[24..28].copy_from_slice(&hash.to_be_bytes());
    }

    /// Sets the tree index (bytes 24-27): position of a node within its row.
    #[inline]
    pub fn set_tree_index(&mut self, index: u32) {
        self.data[24..28].copy_from_slice(&index.to_be_bytes());
    }

    /// Sets the key-and-mask word (bytes 28-31), selecting between key and
    /// bitmask generation in the tweakable hash constructions.
    #[inline]
    pub fn set_key_and_mask(&mut self, key_and_mask: u32) {
        self.data[28..32].copy_from_slice(&key_and_mask.to_be_bytes());
    }

    /// Returns a new address carrying only the layer and tree words of
    /// `self`, everything else zeroed.
    pub fn subtree(&self) -> Address {
        let mut addr = Address::new();
        addr.data[0..12].copy_from_slice(&self.data[0..12]);
        addr
    }

    /// Returns the address as bytes for use as hash input.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.data
    }
}
