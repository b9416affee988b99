pub mod error;
pub mod patch;
pub mod types;

pub use error::{AppError, Result};
pub use patch::Patch;
pub use types::{Page, RecordId};
