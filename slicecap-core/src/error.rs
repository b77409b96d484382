use thiserror::Error;

/// All errors produced by slicecap-core.
#[derive(Debug, Error)]
pub enum SlicecapError {
    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("device offers no stereo integer input at {sample_rate} Hz")]
    UnsupportedSampleFormat { sample_rate: u32 },

    #[error("audio stream became inactive")]
    StreamInactive,

    #[error("slice overflow: consumer could not keep up ({dropped_frames} frames dropped)")]
    Overflow { dropped_frames: usize },

    #[error("malformed slice line at column {column}: {reason}")]
    MalformedLine { column: usize, reason: String },

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine is not running")]
    NotRunning,

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlicecapError {
    /// Process exit code reported when this error ends a capture run.
    pub fn exit_code(&self) -> i32 {
        match self {
            SlicecapError::InvalidConfig(_) => 2,
            SlicecapError::NoDefaultInputDevice => 3,
            SlicecapError::AudioDevice(_) => 4,
            SlicecapError::AudioStream(_) => 5,
            SlicecapError::UnsupportedSampleFormat { .. } => 6,
            SlicecapError::StreamInactive => 7,
            SlicecapError::Overflow { .. } => 8,
            SlicecapError::MalformedLine { .. } => 9,
            SlicecapError::AlreadyRunning | SlicecapError::NotRunning => 10,
            SlicecapError::Wav(_) => 11,
            SlicecapError::Io(_) => 12,
            SlicecapError::Other(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlicecapError>;

#[cfg(test)]
mod tests {
    use super::SlicecapError;

    #[test]
    fn exit_codes_are_nonzero() {
        let errors = [
            SlicecapError::InvalidConfig("x".into()),
            SlicecapError::NoDefaultInputDevice,
            SlicecapError::StreamInactive,
            SlicecapError::Overflow { dropped_frames: 3 },
            SlicecapError::NotRunning,
        ];
        for err in &errors {
            assert_ne!(err.exit_code(), 0, "{err}");
        }
    }

    #[test]
    fn io_errors_convert() {
        let err: SlicecapError = std::io::Error::other("pipe").into();
        assert_eq!(err.exit_code(), 12);
    }
}
