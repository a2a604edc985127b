pub mod error;
pub mod job;
pub mod poll;
pub mod settings;
pub mod transcript;
