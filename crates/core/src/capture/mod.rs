pub mod capture_logger;
pub mod capture_session;
pub mod frame_sampler;
pub mod tracking_recorder;
