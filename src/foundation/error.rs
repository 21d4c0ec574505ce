pub type StitchResult<T> = Result<T, StitchError>;

/// Terminal failure of a stitch. Nothing is retried internally; callers present the failure and
/// may offer a full retry.
#[derive(thiserror::Error, Debug)]
pub enum StitchError {
    #[error("empty timeline: no completed clips to stitch")]
    EmptyTimeline,

    #[error("invalid trim on clip '{clip}': {detail}")]
    InvalidTrim { clip: String, detail: String },

    #[error("load error on clip '{clip}': {detail}")]
    Load { clip: String, detail: String },

    #[error("seek error on clip '{clip}' at {at_secs:.3}s: {detail}")]
    Seek {
        clip: String,
        at_secs: f64,
        detail: String,
    },

    #[error("encoding unsupported: {0}")]
    EncodingUnsupported(String),

    #[error("mix graph error: {0}")]
    MixGraph(String),

    #[error("stitch cancelled")]
    Cancelled,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StitchError {
    pub fn invalid_trim(clip: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidTrim {
            clip: clip.into(),
            detail: detail.into(),
        }
    }

    pub fn load(clip: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Load {
            clip: clip.into(),
            detail: detail.into(),
        }
    }

    pub fn seek(clip: impl Into<String>, at_secs: f64, detail: impl Into<String>) -> Self {
        Self::Seek {
            clip: clip.into(),
            at_secs,
            detail: detail.into(),
        }
    }

    pub fn encoding_unsupported(msg: impl Into<String>) -> Self {
        Self::EncodingUnsupported(msg.into())
    }

    pub fn mix_graph(msg: impl Into<String>) -> Self {
        Self::MixGraph(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
