//! XMSS and XMSS^MT parameter sets as defined in RFC 8391.
//!
//! A [`Params`] value fully describes one instantiation of the scheme: the
//! hash function, the WOTS+ Winternitz parameter, the (hyper)tree geometry
//! and the BDS traversal trade-off. All derived sizes (signature, key and
//! state blob lengths) are computed once in [`Params::new`] and never stored
//! independently, so they cannot drift apart.
//!
//! The named parameter sets of the RFC are available through
//! [`Params::from_name`] (e.g. `"XMSS-SHA2_10_256"`) and through the
//! numeric OID lookups used in the interoperable key format.

use crate::error::{Result, XmssError};

/// Hash function backing the tweakable hash layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashFunc {
    /// SHA-256 (the `XMSS*-SHA2_*_256` parameter sets).
    Sha2,
    /// SHAKE128 with 256-bit output (the `XMSS*-SHAKE_*_256` parameter sets).
    Shake,
}

/// Parameters for one XMSS or XMSS^MT instantiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Params {
    /// Hash function.
    pub func: HashFunc,

    /// Security parameter n (hash output size in bytes).
    pub n: usize,

    /// Winternitz parameter w.
    pub wots_w: usize,

    /// Log base 2 of w.
    pub wots_log_w: usize,

    /// Number of message chains (len1 = 8n / log2(w)).
    pub wots_len1: usize,

    /// Number of checksum chains.
    pub wots_len2: usize,

    /// Total number of WOTS+ chains (len1 + len2).
    pub wots_len: usize,

    /// WOTS+ signature size in bytes (len * n).
    pub wots_sig_bytes: usize,

    /// Height of the complete hypertree.
    pub full_height: usize,

    /// Height of each subtree (full_height / d).
    pub tree_height: usize,

    /// Number of subtree layers; d = 1 is plain XMSS.
    pub d: usize,

    /// BDS trade-off parameter k; the top k subtree levels are cached
    /// verbatim instead of being recomputed.
    pub bds_k: usize,

    /// Width of the leaf index prefix in keys and signatures.
    pub index_bytes: usize,

    /// Signature size in bytes, excluding the appended message.
    pub sig_bytes: usize,

    /// Public key size in bytes (root || pub_seed).
    pub pk_bytes: usize,

    /// Secret key blob size in bytes, including the serialized BDS state.
    pub sk_bytes: usize,
}

/// Named parameter sets: (name, OID, hash, full_height, d).
///
/// OID values per RFC 8391 section 8; only the n = 32 sets are listed since
/// nothing else is supported.
const XMSS_SETS: &[(&str, u32, HashFunc, usize)] = &[
    ("XMSS-SHA2_10_256", 0x0000_0001, HashFunc::Sha2, 10),
    ("XMSS-SHA2_16_256", 0x0000_0002, HashFunc::Sha2, 16),
    ("XMSS-SHA2_20_256", 0x0000_0003, HashFunc::Sha2, 20),
    ("XMSS-SHAKE_10_256", 0x0000_0007, HashFunc::Shake, 10),
    ("XMSS-SHAKE_16_256", 0x0000_0008, HashFunc::Shake, 16),
    ("XMSS-SHAKE_20_256", 0x0000_0009, HashFunc::Shake, 20),
];

const XMSSMT_SETS: &[(&str, u32, HashFunc, usize, usize)] = &[
    ("XMSSMT-SHA2_20/2_256", 0x0000_0001, HashFunc::Sha2, 20, 2),
    ("XMSSMT-SHA2_20/4_256", 0x0000_0002, HashFunc::Sha2, 20, 4),
    ("XMSSMT-SHA2_40/2_256", 0x0000_0003, HashFunc::Sha2, 40, 2),
    ("XMSSMT-SHA2_40/4_256", 0x0000_0004, HashFunc::Sha2, 40, 4),
    ("XMSSMT-SHA2_40/8_256", 0x0000_0005, HashFunc::Sha2, 40, 8),
    ("XMSSMT-SHA2_60/3_256", 0x0000_0006, HashFunc::Sha2, 60, 3),
    ("XMSSMT-SHA2_60/6_256", 0x0000_0007, HashFunc::Sha2, 60, 6),
    ("XMSSMT-SHA2_60/12_256", 0x0000_0008, HashFunc::Sha2, 60, 12),
    ("XMSSMT-SHAKE_20/2_256", 0x0000_0011, HashFunc::Shake, 20, 2),
    ("XMSSMT-SHAKE_20/4_256", 0x0000_0012, HashFunc::Shake, 20, 4),
    ("XMSSMT-SHAKE_40/2_256", 0x0000_0013, HashFunc::Shake, 40, 2),
    ("XMSSMT-SHAKE_40/4_256", 0x0000_0014, HashFunc::Shake, 40, 4),
    ("XMSSMT-SHAKE_40/8_256", 0x0000_0015, HashFunc::Shake, 40, 8),
    ("XMSSMT-SHAKE_60/3_256", 0x0000_0016, HashFunc::Shake, 60, 3),
    ("XMSSMT-SHAKE_60/6_256", 0x0000_0017, HashFunc::Shake, 60, 6),
    ("XMSSMT-SHAKE_60/12_256", 0x0000_0018, HashFunc::Shake, 60, 12),
];

impl Params {
    /// Builds and validates a parameter set.
    ///
    /// `full_height` is the height of the complete hypertree and `d` the
    /// number of subtree layers; `d == 1` gives plain XMSS. `bds_k` trades
    /// signing time against state size: larger values cache more of the top
    /// of each subtree. The named RFC sets all use `bds_k = 0`.
    ///
    /// All configuration errors surface here; once a `Params` exists, the
    /// hash and tree layers cannot fail.
    pub fn new(
        func: HashFunc,
        n: usize,
        full_height: usize,
        d: usize,
        wots_w: usize,
        bds_k: usize,
    ) -> Result<Params> {
        if n != 32 {
            return Err(XmssError::InvalidParams {
                reason: "only n = 32 is supported",
            });
        }
        let wots_log_w = match wots_w {
            4 => 2,
            16 => 4,
            256 => 8,
            _ => {
                return Err(XmssError::InvalidParams {
                    reason: "w must be 4, 16 or 256",
                })
            }
        };
        if d == 0 {
            return Err(XmssError::InvalidParams { reason: "d must be at least 1" });
        }
        if full_height == 0 || full_height >= 64 {
            return Err(XmssError::InvalidParams {
                reason: "full_height must be in 1..64",
            });
        }
        if full_height % d != 0 {
            return Err(XmssError::InvalidParams {
                reason: "d must divide full_height",
            });
        }
        let tree_height = full_height / d;
        if tree_height < 2 {
            return Err(XmssError::InvalidParams {
                reason: "subtree height must be at least 2",
            });
        }
        if bds_k >= tree_height || (tree_height - bds_k) % 2 != 0 {
            return Err(XmssError::InvalidParams {
                reason: "bds_k must be below the subtree height with tree_height - bds_k even",
            });
        }

        // log2(w) divides 8, so the message digest splits evenly into digits.
        let wots_len1 = 8 * n / wots_log_w;
        // Smallest len2 with w^len2 > len1 * (w - 1).
        let mut wots_len2 = 1;
        let mut limit = wots_w as u64;
        while limit <= (wots_len1 * (wots_w - 1)) as u64 {
            wots_len2 += 1;
            limit *= wots_w as u64;
        }
        let wots_len = wots_len1 + wots_len2;
        let wots_sig_bytes = wots_len * n;

        let index_bytes = if d == 1 { 4 } else { (full_height + 7) / 8 };
        let sig_bytes = index_bytes + n + d * wots_sig_bytes + full_height * n;
        let pk_bytes = 2 * n;

        // One serialized BDS state: stack, stack offset, stack levels, auth
        // path, keep nodes, treehash instances, retained right nodes and the
        // NEXT-tree leaf counter.
        let state_bytes = (tree_height + 1) * n
            + 4
            + tree_height
            + 1
            + tree_height * n
            + (tree_height >> 1) * n
            + (tree_height - bds_k) * (7 + n)
            + ((1 << bds_k) - bds_k - 1) * n
            + 4;
        let sk_bytes =
            index_bytes + 4 * n + (2 * d - 1) * state_bytes + (d - 1) * wots_sig_bytes;

        Ok(Params {
            func,
            n,
            wots_w,
            wots_log_w,
            wots_len1,
            wots_len2,
            wots_len,
            wots_sig_bytes,
            full_height,
            tree_height,
            d,
            bds_k,
            index_bytes,
            sig_bytes,
            pk_bytes,
            sk_bytes,
        })
    }

    /// Resolves a named parameter set such as `"XMSS-SHA2_10_256"` or
    /// `"XMSSMT-SHAKE_40/8_256"`.
    pub fn from_name(name: &str) -> Result<Params> {
        for &(set_name, _, func, full_height) in XMSS_SETS {
            if set_name == name {
                return Params::new(func, 32, full_height, 1, 16, 0);
            }
        }
        for &(set_name, _, func, full_height, d) in XMSSMT_SETS {
            if set_name == name {
                // Smallest bds_k leaving an even number of treehash levels.
                return Params::new(func, 32, full_height, d, 16, (full_height / d) % 2);
            }
        }
        Err(XmssError::InvalidParams {
            reason: "unknown parameter set name",
        })
    }

    /// Resolves an XMSS (single-tree) parameter set from its RFC 8391 OID.
    pub fn from_xmss_oid(oid: u32) -> Result<Params> {
        for &(_, set_oid, func, full_height) in XMSS_SETS {
            if set_oid == oid {
                return Params::new(func, 32, full_height, 1, 16, 0);
            }
        }
        Err(XmssError::InvalidParams { reason: "unknown XMSS OID" })
    }

    /// Resolves an XMSS^MT parameter set from its RFC 8391 OID.
    pub fn from_xmssmt_oid(oid: u32) -> Result<Params> {
        for &(_, set_oid, func, full_height, d) in XMSSMT_SETS {
            if set_oid == oid {
                return Params::new(func, 32, full_height, d, 16, (full_height / d) % 2);
            }
        }
        Err(XmssError::InvalidParams { reason: "unknown XMSSMT OID" })
    }

    /// Returns the RFC 8391 OID of this parameter set, if it is one of the
    /// named sets.
    pub fn oid(&self) -> Option<u32> {
        if self.wots_w != 16 || self.bds_k != self.tree_height % 2 || self.n != 32 {
            return None;
        }
        if self.d == 1 {
            for &(_, oid, func, full_height) in XMSS_SETS {
                if func == self.func && full_height == self.full_height {
                    return Some(oid);
                }
            }
        } else {
            for &(_, oid, func, full_height, d) in XMSSMT_SETS {
                if func == self.func && full_height == self.full_height && d == self.d {
                    return Some(oid);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xmss_sha2_10_256_sizes() {
        let p = Params::from_name("XMSS-SHA2_10_256").unwrap();
        assert_eq!(p.n, 32);
        assert_eq!(p.wots_len1, 64);
        assert_eq!(p.wots_len2, 3);
        assert_eq!(p.wots_len, 67);
        assert_eq!(p.wots_sig_bytes, 2144);
        assert_eq!(p.index_bytes, 4);
        assert_eq!(p.sig_bytes, 2500);
        assert_eq!(p.pk_bytes, 64);
        assert_eq!(p.sk_bytes, 1373);
    }

    #[test]
    fn test_xmss_heights() {
        assert_eq!(Params::from_name("XMSS-SHA2_16_256").unwrap().sig_bytes, 2692);
        assert_eq!(Params::from_name("XMSS-SHA2_20_256").unwrap().sig_bytes, 2820);
        assert_eq!(
            Params::from_name("XMSS-SHAKE_10_256").unwrap().func,
            HashFunc::Shake
        );
    }

    #[test]
    fn test_xmssmt_sets() {
        let p = Params::from_name("XMSSMT-SHA2_20/2_256").unwrap();
        assert_eq!(p.d, 2);
        assert_eq!(p.tree_height, 10);
        assert_eq!(p.index_bytes, 3);
        assert_eq!(p.sig_bytes, 3 + 32 + 2 * 2144 + 20 * 32);

        let p = Params::from_name("XMSSMT-SHAKE_60/12_256").unwrap();
        assert_eq!(p.d, 12);
        assert_eq!(p.tree_height, 5);
        assert_eq!(p.index_bytes, 8);
        // Odd subtree height forces bds_k up to 1.
        assert_eq!(p.bds_k, 1);
        assert_eq!(p.oid(), Some(0x18));
    }

    #[test]
    fn test_oid_lookup() {
        let by_name = Params::from_name("XMSS-SHA2_10_256").unwrap();
        let by_oid = Params::from_xmss_oid(0x01).unwrap();
        assert_eq!(by_name, by_oid);
        assert_eq!(by_name.oid(), Some(0x01));

        let mt = Params::from_xmssmt_oid(0x11).unwrap();
        assert_eq!(mt, Params::from_name("XMSSMT-SHAKE_20/2_256").unwrap());
        assert_eq!(mt.oid(), Some(0x11));
    }

    #[test]
    fn test_len2_for_all_w() {
        assert_eq!(Params::new(HashFunc::Sha2, 32, 10, 1, 4, 0).unwrap().wots_len2, 5);
        assert_eq!(Params::new(HashFunc::Sha2, 32, 10, 1, 16, 0).unwrap().wots_len2, 3);
        assert_eq!(Params::new(HashFunc::Sha2, 32, 10, 1, 256, 0).unwrap().wots_len2, 2);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(Params::new(HashFunc::Sha2, 16, 10, 1, 16, 0).is_err());
        assert!(Params::new(HashFunc::Sha2, 32, 10, 1, 5, 0).is_err());
        assert!(Params::new(HashFunc::Sha2, 32, 10, 3, 16, 0).is_err());
        assert!(Params::new(HashFunc::Sha2, 32, 10, 0, 16, 0).is_err());
        assert!(Params::new(HashFunc::Sha2, 32, 64, 1, 16, 0).is_err());
        // tree_height - bds_k must be even
        assert!(Params::new(HashFunc::Sha2, 32, 10, 1, 16, 3).is_err());
        assert!(Params::new(HashFunc::Sha2, 32, 10, 1, 16, 2).is_ok());
        assert!(Params::new(HashFunc::Sha2, 32, 10, 1, 16, 10).is_err());
        assert!(Params::from_name("XMSS-SHA2_11_256").is_err());
    }

    #[test]
    fn test_sk_bytes_with_bds_k() {
        // Nonzero bds_k grows the retain buffer and shrinks the treehash array.
        let p0 = Params::new(HashFunc::Sha2, 32, 4, 1, 16, 0).unwrap();
        let p2 = Params::new(HashFunc::Sha2, 32, 4, 1, 16, 2).unwrap();
        let delta_retain = ((1 << 2) - 2 - 1) * 32;
        let delta_treehash = 2 * (7 + 32);
        assert_eq!(p2.sk_bytes, p0.sk_bytes + delta_retain - delta_treehash);
    }
}
