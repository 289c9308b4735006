use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use libris_core::config::WorkerConfig;
use libris_core::OutboundMessage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::queue::MailQueue;
use crate::sender::Mailer;

struct RunningWorker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

/// The single background consumer of a [`MailQueue`].
///
/// [`start`](Self::start) is idempotent: at most one consumer task exists per
/// worker. Messages are delivered strictly one at a time in queue order. A
/// failed send is logged and dropped; the loop always moves on.
pub struct MailWorker {
    queue: Arc<MailQueue>,
    mailer: Arc<Mailer>,
    poll_interval: Duration,
    heartbeat: Duration,
    state: Mutex<Option<RunningWorker>>,
}

impl MailWorker {
    pub fn new(queue: Arc<MailQueue>, mailer: Arc<Mailer>, config: &WorkerConfig) -> Self {
        Self {
            queue,
            mailer,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            heartbeat: Duration::from_secs(config.heartbeat_secs.max(1)),
            state: Mutex::new(None),
        }
    }

    /// Spawn the consumer task unless one is already running.
    ///
    /// Returns `true` when this call started it. Must be called inside a
    /// tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(running) = state.as_ref() {
            if !running.handle.is_finished() {
                debug!("email worker already running");
                return false;
            }
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.queue),
            Arc::clone(&self.mailer),
            self.poll_interval,
            self.heartbeat,
            shutdown_rx,
        ));
        *state = Some(RunningWorker {
            handle,
            shutdown: shutdown_tx,
        });
        info!("email worker started");
        true
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Stop the consumer after it has delivered whatever is already queued.
    pub async fn shutdown(&self) {
        let running = self.state.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(running) = running else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            error!("email worker task failed: {e}");
        }
        info!("email worker stopped");
    }
}

async fn run_loop(
    queue: Arc<MailQueue>,
    mailer: Arc<Mailer>,
    poll_interval: Duration,
    heartbeat: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_heartbeat = Instant::now();
    let mut processed: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            message = queue.dequeue_timeout(poll_interval) => message,
        };

        match next {
            Some(message) => {
                deliver_one(&mailer, message).await;
                processed += 1;
            }
            None => {
                if last_heartbeat.elapsed() >= heartbeat {
                    info!(processed, queued = queue.len(), "email worker alive");
                    last_heartbeat = Instant::now();
                }
            }
        }
    }

    let pending = queue.len();
    if pending > 0 {
        info!(pending, "email worker draining queue before exit");
    }
    while let Some(message) = queue.try_dequeue() {
        deliver_one(&mailer, message).await;
    }
}

/// Send one message in its own task so a panic in a transport cannot take
/// the consumer down with it.
async fn deliver_one(mailer: &Arc<Mailer>, message: OutboundMessage) {
    let id = message.id.clone();
    let to = message.to.clone();
    let mailer = Arc::clone(mailer);

    info!(message_id = %id, to = %to, "processing queued email");
    match tokio::spawn(async move { mailer.deliver(&message).await }).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(message_id = %id, to = %to, code = e.code(), error = %e, "queued email failed");
        }
        Err(e) => {
            error!(message_id = %id, to = %to, "queued email send panicked: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::settings::{EmailConfig, StaticSource};
    use crate::transport::{EmailTransport, Envelope, TransportConnector, TransportSpec};
    use async_trait::async_trait;

    #[derive(Default)]
    struct Log {
        sent: Mutex<Vec<Envelope>>,
    }

    struct LoggingTransport(Arc<Log>);

    #[async_trait]
    impl EmailTransport for LoggingTransport {
        fn name(&self) -> &'static str {
            "log"
        }

        async fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
            if envelope.subject == "panic" {
                panic!("transport blew up");
            }
            if envelope.subject == "fail" {
                return Err(TransportError::SendFailed("550 mailbox unavailable".into()));
            }
            self.0.sent.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    struct LogConnector(Arc<Log>);

    impl TransportConnector for LogConnector {
        fn connect(&self, _spec: &TransportSpec) -> Result<Box<dyn EmailTransport>, TransportError> {
            Ok(Box::new(LoggingTransport(Arc::clone(&self.0))))
        }
    }

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_server: Some("smtp.example.com".into()),
            smtp_port: 587,
            api_url: None,
            api_key: None,
            email_address: Some("library@aoa.school".into()),
            email_password: Some("secret".into()),
            library_name: "AOA Library".into(),
        }
    }

    fn worker(log: &Arc<Log>) -> (Arc<MailQueue>, MailWorker) {
        let queue = Arc::new(MailQueue::new());
        let mailer = Arc::new(Mailer::new(
            Arc::new(StaticSource(Some(config()))),
            Arc::new(LogConnector(Arc::clone(log))),
            Duration::from_secs(5),
        ));
        let worker = MailWorker::new(
            Arc::clone(&queue),
            mailer,
            &WorkerConfig {
                poll_interval_ms: 20,
                heartbeat_secs: 1,
            },
        );
        (queue, worker)
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let log = Arc::new(Log::default());
        let (_queue, worker) = worker(&log);

        assert!(worker.start());
        assert!(!worker.start());
        assert!(!worker.start());
        assert!(worker.is_running());

        worker.shutdown().await;
        assert!(!worker.is_running());
    }

    #[tokio::test]
    async fn failures_and_panics_do_not_stop_the_loop() {
        let log = Arc::new(Log::default());
        let (queue, worker) = worker(&log);
        worker.start();

        queue.enqueue_email("a@aoa.school", "fail", "b");
        queue.enqueue_email("b@aoa.school", "panic", "b");
        queue.enqueue_email("c@aoa.school", "ok", "b");

        for _ in 0..100 {
            if !log.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(worker.is_running());
        let sent = log.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "c@aoa.school");
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_drains_pending_messages() {
        let log = Arc::new(Log::default());
        let (queue, worker) = worker(&log);

        for i in 0..5 {
            queue.enqueue_email(format!("s{i}@aoa.school"), format!("m{i}"), "b");
        }
        worker.start();
        worker.shutdown().await;

        let subjects: Vec<_> = log
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.subject.clone())
            .collect();
        assert_eq!(subjects, ["m0", "m1", "m2", "m3", "m4"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn shutdown_without_start_is_a_no_op() {
        let log = Arc::new(Log::default());
        let (_queue, worker) = worker(&log);
        worker.shutdown().await;
        assert!(!worker.is_running());
    }
}
