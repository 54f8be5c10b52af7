//! Infrastructure layer implementations.

pub mod metric_store;
pub mod node_api;
pub mod observability;
pub mod peers;

pub use metric_store::MetricStore;
pub use node_api::{RestClientConfig, RestNodeClient};
pub use observability::{LogFormat, init_tracing};
pub use peers::{FileAddressBook, ProcNetConnectionTable, parse_address_book};
