/// Integration tests for knowledge progression: blended transitions, per-key
/// serialization, and content-analysis evidence.

mod helpers;
mod concurrency;
mod progression;
