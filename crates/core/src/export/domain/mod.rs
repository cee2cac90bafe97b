pub mod export_row;
pub mod tabular_exporter;
