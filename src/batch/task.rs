//! Per-image futures returned by asynchronous batch runs.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{ChainError, Result};
use crate::raster::RasterImage;

/// One processed image, tagged with its position in the input.
#[derive(Debug)]
pub struct BatchOutput {
    pub index: usize,
    pub image: RasterImage,
}

enum TaskState {
    Pending(oneshot::Receiver<Result<BatchOutput>>),
    Failed(Option<ChainError>),
}

/// Future resolving to the result for one image.
///
/// Failures, including failures to start the work at all, are carried inside
/// the future rather than raised when the tasks are created.
pub struct ImageTask {
    index: usize,
    state: TaskState,
}

impl ImageTask {
    pub(crate) fn pending(index: usize, receiver: oneshot::Receiver<Result<BatchOutput>>) -> Self {
        Self {
            index,
            state: TaskState::Pending(receiver),
        }
    }

    pub(crate) fn failed(index: usize, error: ChainError) -> Self {
        Self {
            index,
            state: TaskState::Failed(Some(ChainError::batch(index, error))),
        }
    }

    /// Input position of the image this task processes.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Future for ImageTask {
    type Output = Result<BatchOutput>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let index = self.index;
        match &mut self.state {
            TaskState::Pending(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(_)) => Poll::Ready(Err(ChainError::batch(
                    index,
                    ChainError::processing("worker exited before reporting a result"),
                ))),
                Poll::Pending => Poll::Pending,
            },
            TaskState::Failed(error) => Poll::Ready(Err(error.take().unwrap_or_else(|| {
                ChainError::batch(index, ChainError::processing("task polled after completion"))
            }))),
        }
    }
}

impl std::fmt::Debug for ImageTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            TaskState::Pending(_) => "pending",
            TaskState::Failed(_) => "failed",
        };
        f.debug_struct("ImageTask")
            .field("index", &self.index)
            .field("state", &state)
            .finish()
    }
}
