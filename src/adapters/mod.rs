// Adapters layer: concrete implementations for external systems (CSV input, filesystem output).

pub mod csv_loader;
pub mod storage;
