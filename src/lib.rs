pub mod types;
pub mod taxonomy;
pub mod marks;
pub mod classifier;
pub mod record;
pub mod error;

pub use classifier::AsynchronyClassifier;
pub use error::{PvaError, Result};
pub use marks::MarkExtractor;
pub use record::VentilationRecord;
pub use types::*;
