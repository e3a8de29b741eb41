use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("device read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("device stream ended")]
    EndOfStream,
    #[error("failed to open serial device: {0}")]
    Serial(#[from] serialport::Error),
    #[error("ring capacity must be at least 2, got {0}")]
    InvalidCapacity(usize),
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("failed to encode snapshot: {0}")]
    Snapshot(#[from] image::ImageError),
}
// bitmap replay errors carry the backend error type
impl<E> From<DrawingAreaErrorKind<E>> for ScopeError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        match err {
            DrawingAreaErrorKind::BackendError(inner) => ScopeError::Plot(format!("bitmap backend: {inner:?}")),
            other => ScopeError::Plot(format!("{other:?}")),
        }
    }
}
