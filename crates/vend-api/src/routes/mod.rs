//! API route modules.

pub mod entries;
pub mod webhooks;
