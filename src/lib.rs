pub mod config;
pub mod data;
pub mod endpoint;
pub mod error;
pub mod normalize;
pub mod store;

pub use config::Config;
pub use data::{CapturedMessage, NewMessage};
pub use error::{CaptureError, NormalizeError, StoreError};
pub use store::{MessageStore, SqliteStore};
