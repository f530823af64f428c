//! Content digest used for idempotent submission.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Hex SHA-256 over the canonical JSON of `{args, name}`.
///
/// `serde_json`'s map type keeps keys ordered, so serialization is
/// deterministic for equal inputs at every nesting depth. Job references
/// must already be compressed to their tagged form before hashing.
pub fn dedup_hash(job_type: &str, compressed_args: &Map<String, Value>) -> Result<String, Error> {
    let canonical = serde_json::json!({
        "args": compressed_args,
        "name": job_type,
    });
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn equal_args_hash_equal() {
        let a = map(json!({"x": 1, "y": [1, 2, {"z": "s"}]}));
        let b = map(json!({"y": [1, 2, {"z": "s"}], "x": 1}));
        assert_eq!(
            dedup_hash("demo.seed", &a).unwrap(),
            dedup_hash("demo.seed", &b).unwrap()
        );
    }

    #[test]
    fn type_name_is_part_of_the_digest() {
        let args = map(json!({"x": 1}));
        assert_ne!(
            dedup_hash("demo.seed", &args).unwrap(),
            dedup_hash("demo.other", &args).unwrap()
        );
    }

    #[test]
    fn different_args_hash_differently() {
        assert_ne!(
            dedup_hash("demo.seed", &map(json!({"x": 1}))).unwrap(),
            dedup_hash("demo.seed", &map(json!({"x": 2}))).unwrap()
        );
    }
}
