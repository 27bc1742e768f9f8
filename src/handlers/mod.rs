// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token with a per-route permission)
pub mod public;    // Tier 1: /, /health, fallback
pub mod protected; // Tier 2: /drinks*, gated by permission
