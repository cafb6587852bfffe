pub type SynthResult<T> = Result<T, SynthError>;

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    /// Fatal before any sample is generated: bad font, empty vocabulary,
    /// empty atlas, invalid configuration.
    #[error("setup error: {0}")]
    Setup(String),

    /// Per-sample failure: missing glyph, compositing size mismatch.
    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SynthError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
