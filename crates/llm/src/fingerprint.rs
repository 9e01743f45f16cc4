//! Deterministic cache keys for AI requests.

use sha2::{Digest, Sha256};
use study_core::{Caller, Fingerprint, OperationKind};

/// Collects the parts of a request that decide its answer and hashes them.
///
/// Prompt text is trimmed and whitespace-collapsed; context ids are sorted
/// and deduplicated, so formatting noise and id order never split the cache.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    kind: OperationKind,
    caller: Caller,
    model: String,
    prompt: String,
    context_ids: Vec<String>,
    params: Vec<(String, String)>,
}

impl FingerprintBuilder {
    pub fn new(kind: OperationKind, caller: Caller, model: &str, prompt: &str) -> Self {
        Self {
            kind,
            caller,
            model: model.to_string(),
            prompt: normalize_prompt(prompt),
            context_ids: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add a context identifier such as `file:12` or `guide:3`.
    pub fn context(mut self, id: impl Into<String>) -> Self {
        self.context_ids.push(id.into());
        self
    }

    pub fn contexts<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Add a named parameter that changes the answer (level, length, subject).
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(mut self) -> Fingerprint {
        self.context_ids.sort();
        self.context_ids.dedup();
        self.params.sort();

        let mut hasher = Sha256::new();
        // Each field is length-prefixed so adjacent fields cannot run together.
        let mut field = |tag: &str, value: &str| {
            hasher.update(tag.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        };
        field("kind", self.kind.as_str());
        field("caller", &self.caller.fingerprint_token());
        field("model", &self.model);
        field("prompt", &self.prompt);
        for id in &self.context_ids {
            field("ctx", id);
        }
        for (name, value) in &self.params {
            field(name, value);
        }
        let digest = hasher.finalize();
        Fingerprint(format!("{digest:x}"))
    }
}

/// Trim and collapse runs of whitespace to a single space.
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}
