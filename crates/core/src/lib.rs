pub mod audio;
pub mod capture;
pub mod export;
pub mod landmarks;
pub mod shared;
pub mod survey;
pub mod video;
