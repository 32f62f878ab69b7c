//! Cross-crate integration tests for the Vend pipeline live in `tests/`.
//! This library target is intentionally empty.
