pub mod media;
pub mod metrics;
pub mod speech;
pub mod storage;
