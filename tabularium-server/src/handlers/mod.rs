pub mod connect;
pub mod jobs;
