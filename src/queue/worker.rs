use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::{settle, ClaimedJob, JobSource, PgJobQueue, QueueError, Settlement, HANDLE_TIMEOUT};
use crate::telemetry;
use crate::telemetry::ops::work::Phase as WorkPhase;

/// Processes one job type. Resolving means success; an error rejects the delivery.
#[async_trait]
pub trait JobHandler: Send + Sync {
    type Payload: DeserializeOwned + Send;
    type Error: std::fmt::Display + Send;

    async fn handle(&self, payload: Self::Payload) -> Result<(), Self::Error>;
}

/// Polls one queue and hands each delivery to the injected handler.
pub struct Worker<H: JobHandler, S: JobSource = PgJobQueue> {
    source: S,
    handler: H,
    poll_interval: Duration,
    retry_backoff: Duration,
    handle_timeout: Duration,
    worker_id: String,
}

impl<H: JobHandler, S: JobSource> Worker<H, S> {
    pub fn new(source: S, handler: H, poll_interval: Duration, retry_backoff: Duration) -> Self {
        Self {
            source,
            handler,
            poll_interval,
            retry_backoff,
            handle_timeout: HANDLE_TIMEOUT,
            worker_id: Uuid::new_v4().to_string(),
        }
    }

    /// Deliveries still running after `timeout` are rejected; keep it below the claim lease.
    pub fn with_handle_timeout(mut self, timeout: Duration) -> Self {
        self.handle_timeout = timeout;
        self
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<(), QueueError> {
        let log = telemetry::work();
        log.info_kv("👷 worker started", [("queue", self.source.name().to_string()), ("worker_id", self.worker_id.clone())]);
        while !cancel.is_cancelled() {
            let worked = match self.run_once().await {
                Ok(worked) => worked,
                Err(e) => {
                    log.error_kv("queue error", [("error", e.to_string())]);
                    false
                }
            };
            if !worked {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        log.info("👋 worker stopped");
        Ok(())
    }

    /// Claims and processes at most one job; `Ok(false)` when the queue had nothing due.
    pub async fn run_once(&self) -> Result<bool, QueueError> {
        let log = telemetry::work();
        let claimed = self.source.claim(&self.worker_id).instrument(log.span(&WorkPhase::Claim)).await?;
        let Some(job) = claimed else { return Ok(false) };

        let span = log.root_span_kv([
            ("job_id", job.job_id.to_string()),
            ("queue", job.queue.clone()),
            ("attempt", format!("{}/{}", job.attempts, job.max_attempts)),
        ]);
        let outcome = self.dispatch(&job).instrument(span).await;
        let settlement = settlement_for(&job, &outcome, self.retry_backoff);
        if let Err(Rejection::Malformed(e) | Rejection::Handler(e)) = &outcome {
            log.warn_kv("job rejected", [("job_id", job.job_id.to_string()), ("error", e.clone()), ("settlement", format!("{:?}", settlement))]);
        }
        self.source.apply(job.job_id, &settlement).instrument(log.span(&WorkPhase::Settle)).await?;
        Ok(true)
    }

    async fn dispatch(&self, job: &ClaimedJob) -> Result<(), Rejection> {
        let log = telemetry::work();
        let payload: H::Payload = serde_json::from_value(job.payload.0.clone())
            .map_err(|e| Rejection::Malformed(format!("malformed payload: {e}")))?;
        let handled = tokio::time::timeout(self.handle_timeout, self.handler.handle(payload))
            .instrument(log.span(&WorkPhase::Handle))
            .await;
        match handled {
            Ok(result) => result.map_err(|e| Rejection::Handler(e.to_string())),
            Err(_) => Err(Rejection::Handler(format!("handler timed out after {:?}", self.handle_timeout))),
        }
    }
}

#[derive(Debug)]
enum Rejection {
    Malformed(String),
    Handler(String),
}

fn settlement_for(job: &ClaimedJob, outcome: &Result<(), Rejection>, backoff: Duration) -> Settlement {
    match outcome {
        // undecodable payloads will never succeed
        Err(Rejection::Malformed(_)) if job.remove_on_fail => Settlement::Remove,
        Err(Rejection::Malformed(e)) => Settlement::Fail { error: e.clone() },
        Err(Rejection::Handler(e)) => settle(job, Err(e.clone()), backoff),
        Ok(()) => settle(job, Ok(()), backoff),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Deserialize)]
    struct Ping {
        n: u32,
    }

    #[derive(Default)]
    struct EchoHandler {
        seen: Mutex<Vec<u32>>,
        fail: bool,
        stall: Option<Duration>,
    }

    #[async_trait]
    impl JobHandler for EchoHandler {
        type Payload = Ping;
        type Error = String;

        async fn handle(&self, payload: Ping) -> Result<(), String> {
            self.seen.lock().unwrap().push(payload.n);
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            if self.fail { Err(format!("ping {} refused", payload.n)) } else { Ok(()) }
        }
    }

    #[derive(Default)]
    struct StubSource {
        due: Mutex<VecDeque<ClaimedJob>>,
        settled: Mutex<Vec<(i64, Settlement)>>,
    }

    impl StubSource {
        fn with(jobs: Vec<ClaimedJob>) -> Self {
            Self { due: Mutex::new(jobs.into()), settled: Mutex::default() }
        }

        fn settled(&self) -> Vec<(i64, Settlement)> {
            self.settled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobSource for StubSource {
        fn name(&self) -> &str {
            "test"
        }

        async fn claim(&self, _worker_id: &str) -> Result<Option<ClaimedJob>, QueueError> {
            Ok(self.due.lock().unwrap().pop_front())
        }

        async fn apply(&self, job_id: i64, settlement: &Settlement) -> Result<(), QueueError> {
            self.settled.lock().unwrap().push((job_id, settlement.clone()));
            Ok(())
        }
    }

    fn delivery(job_id: i64, payload: serde_json::Value, attempts: i32, max_attempts: i32, remove_on_fail: bool) -> ClaimedJob {
        ClaimedJob {
            job_id,
            queue: "test".into(),
            payload: sqlx::types::Json(payload),
            attempts,
            max_attempts,
            remove_on_complete: false,
            remove_on_fail,
        }
    }

    fn worker(source: StubSource, handler: EchoHandler) -> Worker<EchoHandler, StubSource> {
        Worker::new(source, handler, Duration::from_millis(5), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn decoded_payload_reaches_handler_and_completes() {
        let w = worker(StubSource::with(vec![delivery(1, json!({ "n": 7 }), 1, 3, false)]), EchoHandler::default());

        assert!(w.run_once().await.unwrap());
        assert!(!w.run_once().await.unwrap());
        assert_eq!(*w.handler.seen.lock().unwrap(), vec![7]);
        assert_eq!(w.source.settled(), vec![(1, Settlement::Complete)]);
    }

    #[tokio::test]
    async fn malformed_payload_fails_without_calling_handler() {
        let source = StubSource::with(vec![
            delivery(1, json!({ "podcast": "seven" }), 1, 3, false),
            delivery(2, json!("garbage"), 1, 3, true),
        ]);
        let w = worker(source, EchoHandler::default());

        assert!(w.run_once().await.unwrap());
        assert!(w.run_once().await.unwrap());
        assert!(w.handler.seen.lock().unwrap().is_empty());

        let settled = w.source.settled();
        assert!(matches!(&settled[0], (1, Settlement::Fail { error }) if error.starts_with("malformed payload")));
        assert_eq!(settled[1], (2, Settlement::Remove));
    }

    #[tokio::test]
    async fn handler_error_is_retried_while_attempts_remain() {
        let source = StubSource::with(vec![delivery(1, json!({ "n": 1 }), 1, 2, false), delivery(2, json!({ "n": 2 }), 2, 2, false)]);
        let w = worker(source, EchoHandler { fail: true, ..EchoHandler::default() });

        w.run_once().await.unwrap();
        w.run_once().await.unwrap();
        assert_eq!(
            w.source.settled(),
            vec![
                (1, Settlement::Retry { delay: Duration::from_secs(30), error: "ping 1 refused".into() }),
                (2, Settlement::Fail { error: "ping 2 refused".into() }),
            ]
        );
    }

    #[tokio::test]
    async fn slow_handler_is_rejected_as_a_timeout() {
        let source = StubSource::with(vec![delivery(1, json!({ "n": 1 }), 1, 1, false)]);
        let handler = EchoHandler { stall: Some(Duration::from_secs(30)), ..EchoHandler::default() };
        let w = worker(source, handler).with_handle_timeout(Duration::from_millis(20));

        w.run_once().await.unwrap();
        let settled = w.source.settled();
        assert!(matches!(&settled[0], (1, Settlement::Fail { error }) if error.contains("timed out")));
    }

    #[tokio::test]
    async fn run_drains_then_stops_on_cancel() {
        let source = StubSource::with(vec![delivery(1, json!({ "n": 1 }), 1, 1, false), delivery(2, json!({ "n": 2 }), 1, 1, false)]);
        let w = worker(source, EchoHandler::default());
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        let run = w.run(cancel);
        let stop = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        };
        let (result, ()) = tokio::join!(run, stop);
        result.unwrap();
        assert_eq!(*w.handler.seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(w.source.settled().len(), 2);
    }

    #[test]
    fn default_timeout_stays_inside_the_lease() {
        assert!(HANDLE_TIMEOUT < crate::queue::JOB_LEASE);
    }
}
