/// Integration tests for the AI orchestrator: cache fingerprints, single-flight
/// coalescing, bounded retries, the provider call ceiling and response parsing.

mod helpers;
mod failures;
