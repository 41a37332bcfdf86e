pub mod predictions;

pub use predictions::SqlitePredictionLedger;
