//! Billbook Storage - Read-Through Cache and Remote Source
//!
//! Sits between the application and the hosted backend of record. Reads go
//! through a single-flight TTL cache; writes report the entity they touched
//! so the affected listings are invalidated.

pub mod cache;
pub mod remote;
pub mod session;

pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CacheStats, CacheStore, CacheValue, CachedReads, Clock,
    EntityChange, InvalidationPlan, ManualClock, RemoteSource, SystemClock, TtlClass,
};
pub use remote::{InMemoryRemote, SeedData};
pub use session::{PersistedSession, Session, SessionError};
