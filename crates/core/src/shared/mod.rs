pub mod capture_error;
pub mod constants;
pub mod frame;
pub mod model_resolver;
pub mod point;
pub mod video_metadata;
