//! Provenance fingerprints (versioned).
//!
//! Every destination record carries a fingerprint of the source row it was
//! built from, so a re-migration of unchanged source data reproduces the same
//! value and downstream persistence can dedup on it.
//!
//! v1 uses a **simple, deterministic, non-cryptographic** digest:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: `external_id=<id>|external_created_time=<time>` as UTF-8 bytes
//! - output: `"provfnv1a64:<16 lowercase hex digits>"`
//!
//! The runtime's default hasher is randomly seeded per process and must never
//! be used here.

/// Prefix used in serialized provenance fingerprints.
pub const PROVENANCE_FINGERPRINT_V1_PREFIX: &str = "provfnv1a64:";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001b3;

fn add(hash: &mut u64, s: &str) {
    for b in s.as_bytes() {
        *hash ^= (*b) as u64;
        *hash = hash.wrapping_mul(FNV_PRIME);
    }
}

/// Raw FNV-1a 64-bit hash of a provenance pair.
pub fn provenance_hash_v1(external_id: &str, external_created_time: &str) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    add(&mut hash, "external_id=");
    add(&mut hash, external_id);
    add(&mut hash, "|external_created_time=");
    add(&mut hash, external_created_time);
    hash
}

/// Compute the v1 provenance fingerprint for a source row.
pub fn provenance_fingerprint_v1(external_id: &str, external_created_time: &str) -> String {
    let hash = provenance_hash_v1(external_id, external_created_time);
    format!("{PROVENANCE_FINGERPRINT_V1_PREFIX}{hash:016x}")
}

/// Derive a target `idno` for records whose source row has none.
///
/// `kind` is a short prefix such as `"ent"` or `"loc"`.
pub fn derived_idno_v1(kind: &str, external_id: &str, external_created_time: &str) -> String {
    let hash = provenance_hash_v1(external_id, external_created_time);
    format!("{kind}-{hash:016x}")
}
