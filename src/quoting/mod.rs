//! Swap quote module.
//!
//! # Data Flow
//! ```text
//! (from_token, to_token, amount)
//!     → RateSource (fixed table or HTTP price feed)
//!     → SwapQuoteEngine (to_amount = amount × rate)
//!     → SwapQuote (immutable)
//! ```

pub mod engine;
pub mod feed;
pub mod types;

pub use engine::{FixedRates, RateSource, SwapQuoteEngine};
pub use feed::PriceFeed;
pub use types::SwapQuote;
