//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_names_adapter;
pub mod csv_result_adapter;
pub mod file_config_adapter;
