// handlers/public/mod.rs - Public handlers (no tenant or session required)

pub mod home;

pub use home::{health, root};
