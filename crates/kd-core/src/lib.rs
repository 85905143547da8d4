pub mod error;
pub mod settings;
pub mod types;

pub use error::KdError;
pub use settings::*;
pub use types::*;
