pub mod audio_processing;
pub mod transcription;
