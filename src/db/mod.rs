pub mod cache;
pub mod postgres;
pub mod redis;
pub mod repositories;

pub use self::cache::{Cache, CacheKey, CacheStore, CacheTtl, MemoryStore};
pub use self::postgres::{create_pool, run_migrations};
pub use self::redis::{create_redis_client, CacheWriterHandle, RedisStore};
