pub mod loader;
pub mod types;

pub use loader::{LoaderError, PriceCsvLoader};
pub use types::{DataError, PricePoint, PriceTable, ValuePoint, ValueSeries};
