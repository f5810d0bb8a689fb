pub mod api;
pub mod clock;
pub mod compactor;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod scheduler;
pub mod slots;
pub mod store;
pub mod wal;
