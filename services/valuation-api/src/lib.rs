//! House-price valuation service: regression pricing, growth projections and
//! region index forecasts.

pub mod cagr;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod growth;
pub mod prediction;
pub mod regions;
pub mod regression;
pub mod routes;
pub mod rppi;
pub mod state;
pub mod trainer;

pub use error::ApiError;
pub use routes::{cors_layer, router};
pub use state::{AppState, Snapshot};
