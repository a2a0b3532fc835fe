use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Integrity envelope for session-cached JSON payloads.
///
/// Website validations and search snippets live in in-process caches for the
/// whole session. Entries are stored as JSON with a SHA-256 checksum; a
/// checksum mismatch on read is treated as a miss so the caller re-fetches
/// from the source instead of serving a corrupted record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SealedCacheEntry {
    /// The cached payload (JSON string).
    pub data: String,
    /// SHA-256 checksum of the payload (hex encoded).
    pub checksum: String,
}

impl SealedCacheEntry {
    /// Creates an entry with a freshly computed checksum.
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    /// Serializes a typed payload into a sealed entry ready for the cache.
    ///
    /// Returns `None` when the payload cannot be represented as JSON, in
    /// which case the value is simply not cached.
    pub fn seal<T: Serialize>(value: &T) -> Option<String> {
        let json = serde_json::to_string(value).ok()?;
        Some(Self::new(json).serialize())
    }

    /// Validates a stored entry and deserializes its payload.
    ///
    /// Returns `None` for invalid JSON, a checksum mismatch, or a payload
    /// that no longer matches the expected type.
    pub fn open<T: DeserializeOwned>(serialized: &str) -> Option<T> {
        let raw = Self::deserialize_and_validate(serialized)?;
        serde_json::from_str(&raw).ok()
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the stored checksum still matches the payload.
    pub fn is_valid(&self) -> bool {
        let computed = Self::compute_checksum(&self.data);
        computed == self.checksum
    }

    /// Serializes the entry for storage in the cache.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserializes and validates an entry, returning the raw payload.
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: SealedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WebsiteStatus, WebsiteValidation};

    #[test]
    fn test_seal_and_open_roundtrip() {
        let validation = WebsiteValidation {
            status: WebsiteStatus::Active,
            final_url: Some("https://eksempel.no/".to_string()),
            http_status: Some(200),
        };

        let sealed = SealedCacheEntry::seal(&validation).unwrap();
        let opened: WebsiteValidation = SealedCacheEntry::open(&sealed).unwrap();
        assert_eq!(opened.status, WebsiteStatus::Active);
        assert_eq!(opened.http_status, Some(200));
    }

    #[test]
    fn test_tampered_entry_rejected() {
        let entry = SealedCacheEntry::new(r#"{"status":"active"}"#.to_string());

        let mut tampered = entry;
        tampered.data = r#"{"status":"inactive"}"#.to_string();

        assert!(!tampered.is_valid());
    }

    #[test]
    fn test_tampered_serialized_entry_opens_as_none() {
        let sealed = SealedCacheEntry::seal(&serde_json::json!({"snippets": "original"})).unwrap();
        let tampered = sealed.replace("original", "poisoned");

        let result: Option<serde_json::Value> = SealedCacheEntry::open(&tampered);
        assert!(result.is_none());
    }

    #[test]
    fn test_wrong_type_opens_as_none() {
        let sealed = SealedCacheEntry::seal(&serde_json::json!(["not", "a", "validation"])).unwrap();
        let result: Option<WebsiteValidation> = SealedCacheEntry::open(&sealed);
        assert!(result.is_none());
    }

    #[test]
    fn test_checksum_consistency() {
        let data = "snippet text".to_string();
        let entry1 = SealedCacheEntry::new(data.clone());
        let entry2 = SealedCacheEntry::new(data);

        assert_eq!(entry1.checksum, entry2.checksum);
    }
}
