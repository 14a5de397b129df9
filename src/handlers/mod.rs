// handlers/mod.rs - Handler tiers
//
// Public (no tenant) → Protected (tenant bound by the routing middleware) →
// Elevated (root principal). Tier membership is enforced by extractors, the
// middleware pipeline itself runs for every route.

pub mod elevated;
pub mod protected;
pub mod public;
