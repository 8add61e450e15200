use std::io::{self, BufRead, BufReader, Read};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cancel::CancelHandle;
use crate::error::{Error, Result};
use crate::issue::Issue;
use crate::request::ReviewRequest;

/// One item of a review stream. `Failed` and `Done` are terminal.
#[derive(Debug)]
pub enum ReviewEvent {
    Issue(Issue),
    Failed(Error),
    Done,
}

impl ReviewEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReviewEvent::Issue(_))
    }
}

pub type EventStream = mpsc::UnboundedReceiver<ReviewEvent>;

pub trait ReviewService {
    /// Start a review. Failures to reach the service are returned here;
    /// everything after that arrives on the stream.
    ///
    /// Once `cancel` fires the implementation must stop reading and release
    /// its connection to the service.
    fn open(
        &self,
        request: &ReviewRequest,
        cancel: &CancelHandle,
    ) -> impl std::future::Future<Output = Result<EventStream>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireEvent {
    Issue(Issue),
    Error(String),
    Done(bool),
}

/// Decode one NDJSON line of the review stream. Blank lines are skipped.
pub fn parse_event_line(line: &str) -> Result<Option<ReviewEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let wire: WireEvent = serde_json::from_str(line)
        .map_err(|e| Error::Session(format!("malformed review event: {e}")))?;
    Ok(Some(match wire {
        WireEvent::Issue(issue) => ReviewEvent::Issue(issue),
        WireEvent::Error(msg) => ReviewEvent::Failed(Error::Session(msg)),
        WireEvent::Done(true) => ReviewEvent::Done,
        WireEvent::Done(false) => {
            return Err(Error::Session(
                "malformed review event: done must be true".to_string(),
            ));
        }
    }))
}

/// Default socket read timeout. It bounds both how long the service may
/// take to start its response and how quickly a cancel closes the stream.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Review service reached over HTTP, streaming newline-delimited JSON.
pub struct HttpReviewService {
    address: String,
    token: Option<String>,
    poll_interval: Duration,
}

impl HttpReviewService {
    pub fn new(address: String, token: Option<String>) -> Self {
        Self {
            address,
            token,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/review", self.address.trim_end_matches('/'))
    }
}

impl ReviewService for HttpReviewService {
    async fn open(&self, request: &ReviewRequest, cancel: &CancelHandle) -> Result<EventStream> {
        let url = self.endpoint();
        let token = self.token.clone();
        let agent = ureq::AgentBuilder::new()
            .timeout_read(self.poll_interval)
            .build();
        let body = serde_json::to_value(request)
            .map_err(|e| Error::Transport(format!("failed to encode review request: {e}")))?;

        info!(url = %url, repo = %request.repo, "opening review stream");
        let target = url.clone();
        let response = tokio::task::spawn_blocking(move || {
            let mut req = agent
                .post(&target)
                .set("Content-Type", "application/json")
                .set("Accept", "application/x-ndjson");
            if let Some(ref token) = token {
                req = req.set("Authorization", &format!("Bearer {token}"));
            }
            req.send_json(body)
        })
        .await
        .map_err(|e| Error::Transport(format!("review request task failed: {e}")))?
        .map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                Error::Transport(format!(
                    "review service returned {code}: {}",
                    body.trim()
                ))
            }
            ureq::Error::Transport(t) => {
                Error::Transport(format!("cannot reach review service at {url}: {t}"))
            }
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || read_events(response.into_reader(), &tx, &cancel));

        Ok(rx)
    }
}

/// Forward NDJSON events from `body` until a terminal event, the end of
/// the body, or cancellation. Dropping `body` closes the connection.
fn read_events(
    body: impl Read,
    tx: &mpsc::UnboundedSender<ReviewEvent>,
    cancel: &CancelHandle,
) {
    let mut reader = BufReader::new(body);
    let mut line = Vec::new();
    loop {
        if cancel.is_cancelled() {
            debug!("review stream cancelled, closing connection");
            return;
        }
        // Bytes read before a timeout stay in `line`, so a partial line is
        // completed by the next read.
        let event = match reader.read_until(b'\n', &mut line) {
            Ok(0) if line.is_empty() => {
                debug!("review stream reached end of body");
                return;
            }
            Ok(_) => {
                let text = String::from_utf8_lossy(&line).into_owned();
                line.clear();
                match parse_event_line(&text) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => ReviewEvent::Failed(e),
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                continue;
            }
            Err(e) => ReviewEvent::Failed(Error::Transport(format!(
                "failed reading review stream: {e}"
            ))),
        };

        let terminal = event.is_terminal();
        if tx.send(event).is_err() {
            debug!("review stream consumer went away");
            return;
        }
        if terminal {
            return;
        }
    }
}
