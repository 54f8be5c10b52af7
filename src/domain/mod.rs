//! Domain layer containing core types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AddressBookError, AppError, ChainStatusError, ConfigError, ConnectionTableError, NodeApiError,
};
pub use traits::{AddressBook, Clock, ConnectionTable, NodeApiClient, SystemClock};
pub use types::{
    AddressSet, HealthResponse, HealthStatus, MetricKind, NodeStatus, ValidatorSet, normalize_ip,
};
