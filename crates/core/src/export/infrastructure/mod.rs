pub mod json_exporter;
pub mod xlsx_exporter;
