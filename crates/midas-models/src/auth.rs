use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The bundle of headers/cookies used to impersonate an authenticated
/// browser session for Xiaohongshu reads (spec §3, GLOSSARY: Capture).
/// Replaced wholesale on every update, never mutated field-by-field,
/// so readers never observe a half-updated capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthCapture {
    pub cookie: String,
    pub user_agent: String,
    pub origin: String,
    pub referer: String,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl AuthCapture {
    /// Invariant from spec §3: a capture with an empty cookie is rejected.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.cookie.trim().is_empty() {
            return Err("cookie must not be empty");
        }
        Ok(())
    }

    /// Cookie pairs as `name=value`, used by the `auth/update` response
    /// and to verify round-trip identity after a capture refresh (R1).
    pub fn cookie_pairs(&self) -> Vec<String> {
        self.cookie
            .split(';')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
