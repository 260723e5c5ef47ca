pub mod actor;
pub mod ordering;
pub mod schema;
pub mod store;

pub use actor::{CatalogActor, CatalogHandle};
pub use ordering::VersionOrdering;
pub use store::{CatalogStats, CatalogStore};
