// handlers/protected/data/mod.rs - Content-type record handlers

pub mod schema;

pub use schema::get as schema_get;
pub use schema::post as schema_post;
