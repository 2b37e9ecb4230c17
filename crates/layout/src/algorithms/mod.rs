pub mod fit;

pub use fit::{check_fit, consume, fits, FitAnalysis};
