pub mod csv_store;
pub mod retry;
pub mod traits;
pub mod validate;

pub use csv_store::{CsvBarStore, CsvSentimentStore};
pub use retry::with_retry;
pub use traits::{MarketData, SentimentFeed};
pub use validate::validate_ordering;
