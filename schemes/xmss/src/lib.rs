//! XMSS and XMSS^MT (eXtended Merkle Signature Scheme) - RFC 8391
//!
//! This crate provides a stateful hash-based signature scheme built from
//! WOTS+ one-time signatures and Merkle trees, with the BDS traversal
//! algorithm amortizing authentication path computation across signatures.
//!
//! # Parameter Sets
//!
//! The RFC 8391 parameter sets with n = 32 are supported, for both SHA-256
//! and SHAKE128. A selection:
//!
//! | Parameter Set | Signatures | Signature Size | Layers |
//! |---------------|-----------|----------------|--------|
//! | **XMSS-SHA2_10_256** | 2^10 | 2,500 B | 1 |
//! | **XMSS-SHA2_16_256** | 2^16 | 2,692 B | 1 |
//! | **XMSS-SHA2_20_256** | 2^20 | 2,820 B | 1 |
//! | **XMSSMT-SHA2_20/2_256** | 2^20 | 4,963 B | 2 |
//! | **XMSSMT-SHA2_40/2_256** | 2^40 | 5,605 B | 2 |
//! | **XMSSMT-SHA2_60/3_256** | 2^60 | 8,392 B | 3 |
//!
//! Look up a set by name with [`Params::from_name`] or by its numeric
//! identifier with [`params::Params::from_xmss_oid`].
//!
//! # Example Usage
//!
//! ```rust
//! use pqsigs_xmss::{keygen, sign, verify, Params};
//! use rand::rngs::OsRng;
//!
//! let params = Params::from_name("XMSSMT-SHA2_20/2_256").unwrap();
//!
//! // Generate a key pair
//! let (public_key, mut secret_key) = keygen(&mut OsRng, params);
//!
//! // Sign a message. The secret key MUST be persisted after every
//! // signature: each call consumes a one-time index.
//! let message = b"Hello, post-quantum world!";
//! let signature = sign(&mut secret_key, message).expect("key not exhausted");
//!
//! // Verify the signature and recover the message
//! assert_eq!(verify(&public_key, &signature).unwrap(), message);
//! ```
//!
//! # Algorithm Overview
//!
//! XMSS is a stateful hash-based signature scheme that uses:
//!
//! - **WOTS+**: Winternitz One-Time Signature as the base building block
//! - **L-trees**: unbalanced trees compressing a WOTS+ public key to a leaf
//! - **Merkle trees**: authenticating 2^h one-time keys under a single root
//! - **BDS traversal**: a bounded per-signature schedule keeping the next
//!   authentication path ready
//!
//! XMSS^MT stacks d layers of trees: each layer signs the root of the tree
//! below with a WOTS+ key, multiplying the total signature capacity.
//!
//! ## Key Generation
//! 1. Generate random seeds: SK.seed, SK.prf, PK.seed
//! 2. Build the layer-0 subtree and chain each layer root into the layer
//!    above with a cached WOTS+ signature
//! 3. Public key: (root, PK.seed)
//! 4. Secret key: (index, SK.seed, SK.prf, root, PK.seed, traversal state)
//!
//! ## Signing
//! 1. Reserve the current index and advance it
//! 2. Compute randomizer R = PRF(SK.prf, index)
//! 3. Hash message: H_msg(R, root, index, message)
//! 4. WOTS+-sign the digest at the current leaf, attach the per-layer
//!    authentication paths
//! 5. Advance the BDS state towards the next index
//!
//! ## Verification
//! 1. Recompute the message digest from R and the index
//! 2. Recover the WOTS+ public key from the signature, compress it to a
//!    leaf, walk the authentication path to the root
//! 3. Repeat per layer; accept if the final root equals the public key
//!
//! # Statefulness Warning
//!
//! Unlike stateless schemes, the secret key changes with every signature.
//! Signing twice with the same index (for example by restoring a key from
//! an old backup) forfeits all security guarantees. Callers must persist
//! the updated key before releasing a signature.
//!
//! # Security Warning
//!
//! This implementation:
//! - Is NOT constant-time and may leak information through timing
//! - Has NOT been audited by security professionals
//! - Should NOT be used in production systems
//!
//! Use only for learning, experimentation, and research.
//!
//! # References
//!
//! - RFC 8391: XMSS: eXtended Merkle Signature Scheme
//! - <https://datatracker.ietf.org/doc/html/rfc8391>

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod address;
pub mod bds;
pub mod error;
pub mod hash;
pub mod keygen;
pub mod merkle;
pub mod params;
pub mod sign;
pub mod utils;
pub mod verify;
pub mod wots;

// Re-export main types and functions for convenience
pub use error::{Result, XmssError};
pub use keygen::{keygen, keygen_internal, PublicKey, SecretKey};
pub use params::{HashFunc, Params};
pub use sign::{sign, Signature};
pub use verify::{verify, verify_bool};
