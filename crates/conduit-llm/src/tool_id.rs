//! Wire-level tool-call identifier rules
//!
//! The Chat Completions API limits `tool_call_id` to 40 characters, while
//! the Messages API restricts `tool_use` IDs to `[a-zA-Z0-9_-]+`. Canonical
//! IDs may violate either rule, so each vendor rewrites them on the way out.

use std::sync::OnceLock;

use dashmap::DashMap;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Longest `tool_call_id` the Chat Completions API accepts
pub const MAX_TOOL_CALL_ID_LENGTH: usize = 40;

/// Prefix of shortened Chat Completions IDs
const SHORT_ID_PREFIX: &str = "tc_";

/// Prefix of sanitized Messages IDs
const SANITIZED_ID_PREFIX: &str = "toolu_";

/// Bytes of the digest kept in a sanitized Messages ID
const SANITIZED_DIGEST_BYTES: usize = 16;

/// Reversible shortening of over-long tool-call IDs
///
/// Shortened IDs are a deterministic digest of the original, and every
/// shortening is remembered so responses that echo a short ID can be mapped
/// back. Entries live as long as the owning adapter; growth is bounded by
/// the number of distinct over-long IDs that pass through it.
#[derive(Debug, Default)]
pub struct ToolCallIdMap {
    originals: DashMap<String, String>,
}

impl ToolCallIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an ID that satisfies the length limit
    ///
    /// IDs within the limit are returned unchanged.
    pub fn normalize(&self, id: &str) -> String {
        if id.chars().count() <= MAX_TOOL_CALL_ID_LENGTH {
            return id.to_owned();
        }

        let digest = hex_digest(id.as_bytes());
        let short_id = format!(
            "{SHORT_ID_PREFIX}{}",
            &digest[..MAX_TOOL_CALL_ID_LENGTH - SHORT_ID_PREFIX.len()]
        );

        self.originals
            .entry(short_id.clone())
            .or_insert_with(|| id.to_owned());

        tracing::debug!(original_len = id.len(), short_id = %short_id, "shortened tool call id");

        short_id
    }

    /// Restore the original ID behind a shortened one
    ///
    /// Unknown IDs are returned unchanged, so this never fails.
    pub fn denormalize(&self, id: &str) -> String {
        self.originals
            .get(id)
            .map_or_else(|| id.to_owned(), |original| original.value().clone())
    }

    /// Number of remembered shortenings
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// Make an ID acceptable to the Messages API
///
/// Valid IDs pass through. Invalid ones are replaced by a digest of the
/// original, so a `tool_use` block and the `tool_result` answering it always
/// sanitize to the same value.
pub fn sanitize_tool_id(id: &str) -> String {
    fn valid_id() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("must be valid regex"))
    }

    if valid_id().is_match(id) {
        return id.to_owned();
    }

    format!(
        "{SANITIZED_ID_PREFIX}{}",
        &hex_digest(id.as_bytes())[..SANITIZED_DIGEST_BYTES * 2]
    )
}

fn hex_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_ID: &str = "adk-0f8fad5b-d9cb-469f-a165-70867728950e-call-with-a-suffix";

    #[test]
    fn short_ids_pass_through() {
        let map = ToolCallIdMap::new();
        let id = "call_abc123";
        assert_eq!(map.normalize(id), id);
        assert_eq!(map.denormalize(id), id);
        assert!(map.is_empty());
    }

    #[test]
    fn id_at_limit_passes_through() {
        let map = ToolCallIdMap::new();
        let id = "a".repeat(MAX_TOOL_CALL_ID_LENGTH);
        assert_eq!(map.normalize(&id), id);
    }

    #[test]
    fn long_ids_are_shortened_and_reversible() {
        let map = ToolCallIdMap::new();
        let short = map.normalize(LONG_ID);

        assert!(short.len() <= MAX_TOOL_CALL_ID_LENGTH);
        assert!(short.starts_with("tc_"));
        assert_eq!(map.denormalize(&short), LONG_ID);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn shortening_is_deterministic() {
        let first = ToolCallIdMap::new().normalize(LONG_ID);
        let second = ToolCallIdMap::new().normalize(LONG_ID);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_ids_denormalize_to_themselves() {
        let map = ToolCallIdMap::new();
        assert_eq!(map.denormalize("tc_unknown"), "tc_unknown");
    }

    #[test]
    fn valid_anthropic_ids_are_kept() {
        for id in ["toolu_01A09q90qw90lq917835lq9", "call-1", "ABC_def-123"] {
            assert_eq!(sanitize_tool_id(id), id);
        }
    }

    #[test]
    fn invalid_anthropic_ids_are_hashed() {
        let sanitized = sanitize_tool_id("call.with:colons/and spaces");
        assert!(sanitized.starts_with("toolu_"));
        assert_eq!(sanitized.len(), "toolu_".len() + 32);
        assert!(sanitized.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn sanitized_id_is_digest_prefix() {
        let id = "call.1";
        let digest = hex_digest(id.as_bytes());
        assert_eq!(sanitize_tool_id(id), format!("toolu_{}", &digest[..32]));
    }

    #[test]
    fn sanitizing_is_deterministic_and_idempotent() {
        let id = "functions.get_weather:0";
        let once = sanitize_tool_id(id);
        assert_eq!(sanitize_tool_id(id), once);
        assert_eq!(sanitize_tool_id(&once), once);
    }

    #[test]
    fn empty_id_is_sanitized() {
        assert!(sanitize_tool_id("").starts_with("toolu_"));
    }
}
