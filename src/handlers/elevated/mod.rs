// handlers/elevated/mod.rs - Elevated handlers (root principal required)
//
// Route Prefix: /api/root/*. Every handler extracts `RootUser`.

pub mod root;
