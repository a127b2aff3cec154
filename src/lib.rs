pub mod error;
pub mod logging;
pub mod mandi;
pub mod utility;

// Re-exports for convenience
pub use error::{PriceError, Result};
pub use mandi::{PriceContext, PriceResolver, PriceResult, PriceSource, RefreshScheduler};
