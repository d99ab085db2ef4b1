//! # Contracts
//!
//! Frozen interface contracts for the query bus.
//! Defines the query model, the result containers and the collaborator traits
//! (handlers, error handlers, cache adapters). The engine crate and any
//! handler/adapter implementation depend only on this crate.
//!
//! ## Query Model
//! - A query is any `'static` value with a stable byte identity
//! - Handlers discriminate on the concrete type through [`Query::downcast_ref`]
//!   (available on `dyn Query`)
//! - Cacheable queries additionally expose a cache key and a cache duration

mod cache;
mod config;
mod context;
mod error;
mod handler;
mod iterator;
mod query;
mod result;
mod stats;

pub use cache::*;
pub use config::*;
pub use context::QueryContext;
pub use error::*;
pub use handler::*;
pub use iterator::{iterator_channel, IteratorReceiver, IteratorResult};
pub use query::{Cacheable, Query, SharedQuery};
pub use result::{CacheMeta, QueryResult};
pub use stats::BusStats;

// Handlers and adapters implement the async traits through this macro.
pub use async_trait::async_trait;
