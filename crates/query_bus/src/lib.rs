//! # Query Bus
//!
//! 进程内查询总线。
//!
//! 负责：
//! - 按注册顺序执行同步 handler 链，前置缓存层
//! - 通过固定大小的 worker 池流式处理 iterator 查询
//! - 将所有失败分发到 error handler
//! - 优雅关闭：排空 worker，关闭缓存 adapter

pub mod bus;
pub mod cache;
pub mod chain;
pub mod fanout;
pub mod metrics;
pub mod worker;

pub use bus::{QueryBus, QueryBusBuilder};
pub use cache::{CacheLayer, MemoryCacheAdapter};
pub use contracts::{
    BusConfig, BusStats, CacheAdapter, Cacheable, ErrorHandler, Handler, IteratorHandler,
    IteratorReceiver, IteratorResult, Query, QueryContext, QueryError, QueryResult, SharedQuery,
};
pub use fanout::ErrorFanout;
pub use metrics::BusMetrics;
pub use worker::PendingQuery;
