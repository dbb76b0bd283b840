// Service exports
pub mod cache;
pub mod geocode;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use geocode::{GeocodeClient, GeocodeError};
pub use store::{EventRow, EventRowPatch, StoreClient, StoreError, StoreTables};
