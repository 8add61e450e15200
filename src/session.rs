use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::CancelHandle;
use crate::error::{Error, Result};
use crate::remote::{EventStream, ReviewEvent, ReviewService};
use crate::request::ReviewRequest;

/// A live review exchange.
///
/// A forwarding task sits between the service's stream and the consumer.
/// It guarantees at most one terminal event, stops forwarding as soon as
/// the cancel handle fires, and closes the consumer's channel when it
/// exits. Issues already forwarded stay readable after close.
pub struct Session {
    events: EventStream,
    cancel: CancelHandle,
    forwarder: JoinHandle<()>,
}

impl Session {
    pub async fn start<S: ReviewService>(
        service: &S,
        request: &ReviewRequest,
        cancel: CancelHandle,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        request.validate()?;
        let upstream = service.open(request, &cancel).await?;

        let (tx, events) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward(upstream, tx, cancel.clone(), timeout));

        Ok(Self {
            events,
            cancel,
            forwarder,
        })
    }

    /// Next event, or `None` once the session has closed and drained.
    pub async fn next_event(&mut self) -> Option<ReviewEvent> {
        self.events.recv().await
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Tear down the session and wait for the forwarder to exit.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.forwarder.await {
            warn!(error = %e, "review session forwarder panicked");
        }
    }
}

async fn forward(
    mut upstream: EventStream,
    tx: mpsc::UnboundedSender<ReviewEvent>,
    cancel: CancelHandle,
    timeout: Option<Duration>,
) {
    let deadline = async {
        match timeout {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut forwarded = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(forwarded, "review session cancelled");
                break;
            }
            _ = &mut deadline => {
                let limit = timeout.unwrap_or_default();
                warn!(?limit, "review session timed out");
                let _ = tx.send(ReviewEvent::Failed(Error::Timeout(limit)));
                break;
            }
            event = upstream.recv() => event,
        };

        match next {
            Some(ReviewEvent::Issue(issue)) => {
                forwarded += 1;
                if tx.send(ReviewEvent::Issue(issue)).is_err() {
                    debug!("session consumer dropped");
                    break;
                }
            }
            Some(terminal) => {
                debug!(forwarded, ?terminal, "review session finished");
                let _ = tx.send(terminal);
                break;
            }
            None => {
                let _ = tx.send(ReviewEvent::Failed(Error::Session(
                    "review stream ended without completing".to_string(),
                )));
                break;
            }
        }
    }
}
