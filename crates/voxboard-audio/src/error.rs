use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no input device available")]
    NoInputDevice,

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("speech synthesis error: {0}")]
    Synthesis(String),
}
