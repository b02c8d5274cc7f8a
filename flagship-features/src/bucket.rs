//! Sticky hash bucketing.

use xxhash_rust::xxh32::xxh32;

/// Number of buckets users are spread across.
pub const BUCKET_COUNT: u32 = 100;

/// Map a user key and salt to a stable bucket in `0..100`.
///
/// The bucket is derived from a 32-bit xxHash of `user_key` followed by
/// `salt`, reduced with `abs(hash) mod 100`. The same pair always lands in the
/// same bucket; changing the salt reshuffles users independently, which keeps
/// flags that share a population from moving in lockstep.
///
/// ```
/// use flagship_features::bucket;
///
/// let b = bucket("user-123", "checkout-v2");
/// assert!(b < 100);
/// assert_eq!(b, bucket("user-123", "checkout-v2"));
/// ```
pub fn bucket(user_key: &str, salt: &str) -> u8 {
    let mut input = Vec::with_capacity(user_key.len() + salt.len());
    input.extend_from_slice(user_key.as_bytes());
    input.extend_from_slice(salt.as_bytes());

    let hash = xxh32(&input, 0) as i32;
    (hash.unsigned_abs() % BUCKET_COUNT) as u8
}
