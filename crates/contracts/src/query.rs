//! Query identity contracts
//!
//! A query is an opaque, immutable value. The engine only reads its identity
//! (and, for cacheable queries, its cache key and duration).

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

/// Shared handle to a type-erased query
pub type SharedQuery = Arc<dyn Query>;

/// Query trait
///
/// Implemented by every value that can be dispatched through the bus.
/// An empty identity marks the query as invalid.
pub trait Query: Any + Send + Sync + 'static {
    /// Stable identity of the query (opaque bytes)
    fn id(&self) -> Bytes;

    /// Cacheable view of this query
    ///
    /// Cacheable queries override this to return `Some(self)`.
    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        None
    }
}

impl dyn Query {
    /// Downcast to the concrete query type
    pub fn downcast_ref<T: Query>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    /// Check whether the query is of the given concrete type
    pub fn is<T: Query>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Identity rendered as a (lossy) UTF-8 string, for logs and error keys
    pub fn id_string(&self) -> String {
        String::from_utf8_lossy(&self.id()).into_owned()
    }
}

/// Cacheable query trait
///
/// A zero `cache_duration` means the result is never written back,
/// although cache reads still apply.
pub trait Cacheable: Query {
    /// Key under which adapters store the result
    fn cache_key(&self) -> Bytes;

    /// How long a stored result stays valid
    fn cache_duration(&self) -> Duration;
}
