pub mod store;

pub use store::{encode_param, timestamp, StoreClient, StoreError};
