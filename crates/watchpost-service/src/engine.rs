//! Dedicated inference thread.
//!
//! ONNX sessions are synchronous and need `&mut` access, so each daemon
//! moves its pipeline onto one OS thread and talks to it over a bounded
//! channel. Handlers hold a cheap [`EngineHandle`] and await the reply.

use image::RgbImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Queue depth used by both daemons.
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

/// Synchronous work run on the engine thread, one image at a time.
pub trait Pipeline: Send + 'static {
    type Output: Send + 'static;
    type Error: std::error::Error + Send + 'static;

    fn run(&mut self, image: RgbImage) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum EngineError<E>
where
    E: std::error::Error + Send + 'static,
{
    #[error(transparent)]
    Pipeline(E),
    #[error("inference panicked: {0}")]
    Panicked(String),
    #[error("engine thread exited")]
    ChannelClosed,
}

type Reply<P> =
    oneshot::Sender<Result<<P as Pipeline>::Output, EngineError<<P as Pipeline>::Error>>>;

struct EngineRequest<P: Pipeline> {
    image: RgbImage,
    reply: Reply<P>,
}

/// Clone-safe handle to an engine thread.
pub struct EngineHandle<P: Pipeline> {
    tx: mpsc::Sender<EngineRequest<P>>,
}

// Manual impl: a derive would require `P: Clone`.
impl<P: Pipeline> Clone for EngineHandle<P> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<P: Pipeline> EngineHandle<P> {
    /// Queue `image` and wait for the pipeline's result.
    pub async fn run(&self, image: RgbImage) -> Result<P::Output, EngineError<P::Error>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Move `pipeline` onto a named OS thread and return a handle to it.
///
/// The thread exits once every handle has been dropped. A panic inside
/// the pipeline is reported to that request's caller and the thread keeps
/// serving.
pub fn spawn_engine<P: Pipeline>(
    name: &str,
    mut pipeline: P,
    queue_depth: usize,
) -> std::io::Result<EngineHandle<P>> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest<P>>(queue_depth.max(1));

    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(EngineRequest { image, reply }) = rx.blocking_recv() {
                let started = std::time::Instant::now();
                let (width, height) = image.dimensions();
                let result = match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(image))) {
                    Ok(result) => result.map_err(EngineError::Pipeline),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::error!(%message, "pipeline panicked");
                        Err(EngineError::Panicked(message))
                    }
                };
                tracing::debug!(
                    width,
                    height,
                    ok = result.is_ok(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "inference done"
                );
                // The caller may have gone away; nothing to do then.
                let _ = reply.send(result);
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("too small")]
    struct TooSmall;

    /// Returns the pixel count, counting how many images it has seen.
    /// Rejects images narrower than 2 and panics on width 99.
    struct Area {
        seen: usize,
    }

    impl Pipeline for Area {
        type Output = (u32, usize);
        type Error = TooSmall;

        fn run(&mut self, image: RgbImage) -> Result<Self::Output, Self::Error> {
            self.seen += 1;
            if image.width() == 99 {
                panic!("bad stride");
            }
            if image.width() < 2 {
                return Err(TooSmall);
            }
            Ok((image.width() * image.height(), self.seen))
        }
    }

    #[tokio::test]
    async fn test_engine_runs_pipeline_in_order() {
        let handle = spawn_engine("test-engine", Area { seen: 0 }, DEFAULT_QUEUE_DEPTH).unwrap();

        let first = handle.run(RgbImage::new(4, 3)).await.unwrap();
        let second = handle.clone().run(RgbImage::new(2, 2)).await.unwrap();

        assert_eq!(first, (12, 1));
        assert_eq!(second, (4, 2));
    }

    #[tokio::test]
    async fn test_pipeline_error_is_transparent() {
        let handle = spawn_engine("test-engine", Area { seen: 0 }, 1).unwrap();
        let err = handle.run(RgbImage::new(1, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Pipeline(TooSmall)));
        assert_eq!(err.to_string(), "too small");
    }

    #[tokio::test]
    async fn test_panic_is_reported_and_engine_survives() {
        let handle = spawn_engine("test-engine", Area { seen: 0 }, 1).unwrap();

        let err = handle.run(RgbImage::new(99, 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Panicked(ref m) if m == "bad stride"));
        assert_eq!(err.to_string(), "inference panicked: bad stride");

        let (area, seen) = handle.run(RgbImage::new(4, 1)).await.unwrap();
        assert_eq!((area, seen), (4, 2));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }

    #[tokio::test]
    async fn test_concurrent_callers() {
        let handle = spawn_engine("test-engine", Area { seen: 0 }, 2).unwrap();
        let tasks: Vec<_> = (2..10u32)
            .map(|w| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.run(RgbImage::new(w, 1)).await })
            })
            .collect();

        let mut areas = Vec::new();
        for task in tasks {
            areas.push(task.await.unwrap().unwrap().0);
        }
        assert_eq!(areas, (2..10).collect::<Vec<u32>>());
    }
}
