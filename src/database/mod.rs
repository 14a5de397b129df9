pub mod manager;
pub mod models;
pub mod record;
pub mod repository;
pub mod router;

pub use manager::{DatabaseError, DatabaseManager};
pub use record::{Record, RecordError};
pub use repository::Repository;
pub use router::{BindingInfo, BoundDatabase, DatabaseRouter};
