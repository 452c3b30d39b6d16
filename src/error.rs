use thiserror::Error;

/// Failure classes seen by the frame consumer.
///
/// `InvalidInput` fails a single frame. `PipelineFault` stops the pipeline.
/// `TransportFault` is logged by the reporter and never reaches the consumer.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid keypoint input: {0}")]
    InvalidInput(String),

    #[error("pipeline fault: {0}")]
    PipelineFault(String),

    #[error("transport fault: {0}")]
    TransportFault(String),
}

impl RelayError {
    /// True when the error should only drop the current frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, RelayError::InvalidInput(_))
    }
}
