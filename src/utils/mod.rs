pub mod error;

pub use error::{AppError, DeliveryError, ExtractionError, FetchError, Result, ValidationError};
