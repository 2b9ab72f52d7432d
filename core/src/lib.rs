pub mod error;
pub mod filesystem;
pub mod variant;

pub use error::FatError;
pub use filesystem::{FormatOptions, FormatReport};
pub use variant::FatVariant;
