//! estimo-model - Price model loading and scoring
//!
//! Evaluates a gradient-boosted tree ensemble saved in XGBoost's JSON model
//! format against rows built by `estimo-core`. The model predicts
//! `log1p(price)`; [`PredictedPrice`] inverts that and rounds to cents.
//!
//! # Example
//!
//! ```ignore
//! use estimo_model::ModelHandle;
//!
//! let handle = ModelHandle::new("model/model.json");
//! let price = handle.get()?.predict_price(&row)?;
//! println!("{}", price.formatted());
//! ```

mod ensemble;
pub mod error;
pub mod estimator;
pub mod price;
pub mod scoring;

pub use ensemble::TreeEnsemble;
pub use error::{ModelError, Result};
pub use estimator::{Estimate, Estimator};
pub use price::{inverse_log_target, PredictedPrice};
pub use scoring::{predict_price, ModelHandle, PriceModel};
