use crate::config::TransferConfig;
use crate::extractor::FeatureNetwork;
use crate::loss::LossTerms;
use crate::pixels;
use crate::tensor::Tensor;
use crate::transfer::{StyleTransfer, TransferError, TransferOutcome, TransferSignal};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Message emitted by a background transfer.
///
/// Completion is the `Progress` event whose `percent` equals 100; a
/// failed run ends with a terminal `Failed` event instead of ever
/// pretending to be a 0%-progress success.
#[derive(Debug)]
pub enum TransferEvent {
    Progress {
        percent: f32,
        loss: LossTerms,
        /// RGBA snapshot of the current synthesized image.
        pixels: Vec<u8>,
    },
    Failed(TransferError),
    Cancelled,
}

/// Handle to a transfer running on its own thread.
///
/// Events arrive on [`TransferJob::events`]; cancellation travels the
/// other way as a control message and is honored between steps.
pub struct TransferJob {
    pub events: Receiver<TransferEvent>,
    cancel: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl TransferJob {
    /// Ask the loop to stop at the next epoch boundary.  Safe to call
    /// more than once or after the run already ended.
    pub fn cancel(&self) {
        let _ = self.cancel.send(());
    }

    /// Block until the worker thread exits.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TransferJob {
    fn drop(&mut self) {
        let _ = self.cancel.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Run a transfer on a dedicated thread.
///
/// The engine is constructed inside the thread so the heavy per-step
/// computation never blocks the caller; the caller consumes
/// [`TransferEvent`]s at its own pace.  Independent jobs share nothing
/// mutable, so any number may run concurrently.
pub fn spawn<N>(
    net: N,
    config: TransferConfig,
    content: Tensor,
    style: Tensor,
) -> TransferJob
where
    N: FeatureNetwork + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel();
    let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        let engine = match StyleTransfer::new(net, config) {
            Ok(engine) => engine,
            Err(e) => {
                let _ = event_tx.send(TransferEvent::Failed(e));
                return;
            }
        };
        let mut snapshot_failure: Option<TransferError> = None;
        let result = engine.run(&content, &style, |report| {
            if cancel_rx.try_recv().is_ok() {
                return TransferSignal::Cancel;
            }
            let snapshot = match pixels::to_pixel_buffer(report.image) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    snapshot_failure = Some(e.into());
                    return TransferSignal::Cancel;
                }
            };
            let sent = event_tx.send(TransferEvent::Progress {
                percent: report.percent,
                loss: report.loss,
                pixels: snapshot,
            });
            // A dropped receiver means nobody is listening anymore.
            if sent.is_err() {
                TransferSignal::Cancel
            } else {
                TransferSignal::Continue
            }
        });
        match result {
            Ok(TransferOutcome::Completed(_)) => {
                // The 100% progress event already carried the final image.
            }
            Ok(TransferOutcome::Cancelled) => match snapshot_failure.take() {
                Some(e) => {
                    crate::error!("background transfer failed: {}", e);
                    let _ = event_tx.send(TransferEvent::Failed(e));
                }
                None => {
                    let _ = event_tx.send(TransferEvent::Cancelled);
                }
            },
            Err(e) => {
                crate::error!("background transfer failed: {}", e);
                let _ = event_tx.send(TransferEvent::Failed(e));
            }
        }
    });
    TransferJob {
        events: event_rx,
        cancel: cancel_tx,
        handle: Some(handle),
    }
}
