// handlers/mod.rs - Handlers split by authentication requirement
//
// Public (no auth) → Protected (bearer token, verified by the feed pipeline)

pub mod protected;
pub mod public;
