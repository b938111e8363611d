//! Fetch -> validate -> parse -> notify loop.
//!
//! Cursor policy: the `from_date` cursor moves to the server's `current_date`
//! only after a cycle fully succeeds (including delivery). Any failure leaves
//! it in place so the next cycle asks for the same window again.
//!
//! Failures are rendered into one message and reported unless identical to the
//! previous failure. A successful cycle clears that marker.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{
    domain::Cursor, notifier::Notifier, ports::HomeworkSource, status, validate, Error, Result,
};

/// What a single cycle ended with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Newest homework status was delivered.
    Delivered,
    /// Response held no homeworks.
    NoUpdates,
    /// Status message was built but the messenger refused it.
    DeliveryFailed,
    /// Fetch/validate/parse failed. `reported` is false when the failure
    /// repeated the previous one and its notification was suppressed.
    Failed { message: String, reported: bool },
}

pub struct Poller {
    source: Arc<dyn HomeworkSource>,
    notifier: Notifier,
    retry_period: Duration,
    cursor: Cursor,
    last_error: Option<String>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn HomeworkSource>,
        notifier: Notifier,
        retry_period: Duration,
        cursor: Cursor,
    ) -> Self {
        Self {
            source,
            notifier,
            retry_period,
            cursor,
            last_error: None,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Poll forever: one cycle, then sleep for the retry period.
    pub async fn run(&mut self) {
        tracing::info!(
            cursor = self.cursor.0,
            retry_period_secs = self.retry_period.as_secs(),
            "poll loop started"
        );
        loop {
            let outcome = self.run_cycle().await;
            tracing::debug!(?outcome, cursor = self.cursor.0, "cycle finished");
            sleep(self.retry_period).await;
        }
    }

    /// Run one cycle. Never fails: errors become (deduplicated) notifications.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        match self.try_cycle().await {
            Ok(outcome) => outcome,
            Err(e) => self.report_failure(e).await,
        }
    }

    async fn try_cycle(&mut self) -> Result<CycleOutcome> {
        let response = self.source.fetch(self.cursor).await?;
        validate::check_response(&response)?;

        let outcome = match validate::homeworks(&response).first() {
            Some(homework) => {
                let message = status::parse_status(homework)?;
                if !self.notifier.notify(&message).await {
                    return Ok(CycleOutcome::DeliveryFailed);
                }
                CycleOutcome::Delivered
            }
            None => {
                tracing::debug!("no new homework submissions");
                CycleOutcome::NoUpdates
            }
        };

        match validate::current_date(&response) {
            Some(next) => self.cursor = Cursor(next),
            None => tracing::warn!(
                cursor = self.cursor.0,
                "response has no integer current_date; keeping cursor"
            ),
        }
        self.last_error = None;

        Ok(outcome)
    }

    async fn report_failure(&mut self, error: Error) -> CycleOutcome {
        let message = format!("Program malfunction: {error}");
        tracing::error!("{message}");

        let reported = self.last_error.as_deref() != Some(message.as_str());
        if reported {
            self.notifier.notify(&message).await;
        } else {
            tracing::debug!("suppressing repeated failure notification");
        }
        self.last_error = Some(message.clone());

        CycleOutcome::Failed { message, reported }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ChatId, Verdict},
        messaging::{port::MessagingPort, types::MessagingCapabilities},
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::{collections::VecDeque, io, sync::Mutex};

    #[derive(Default)]
    struct FakeSource {
        responses: Mutex<VecDeque<Result<Value>>>,
        calls: Mutex<Vec<Cursor>>,
    }

    impl FakeSource {
        fn with(responses: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<Cursor> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HomeworkSource for FakeSource {
        async fn fetch(&self, from_date: Cursor) -> Result<Value> {
            self.calls.lock().unwrap().push(from_date);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"homeworks": []})))
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        fail: Mutex<bool>,
        sends: Mutex<Vec<String>>,
    }

    impl FakeMessenger {
        fn sends(&self) -> Vec<String> {
            self.sends.lock().unwrap().clone()
        }

        fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities::default()
        }

        async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<()> {
            if *self.fail.lock().unwrap() {
                return Err(Error::Delivery("telegram down".to_string()));
            }
            self.sends.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn poller(source: Arc<FakeSource>, messenger: Arc<FakeMessenger>) -> Poller {
        Poller::new(
            source,
            Notifier::new(messenger, ChatId(1)),
            Duration::from_secs(600),
            Cursor(500),
        )
    }

    fn status_503() -> Error {
        Error::UnexpectedStatus {
            status: 503,
            endpoint: "http://api.test/".to_string(),
            from_date: 500,
        }
    }

    #[tokio::test]
    async fn newest_homework_is_notified_once_and_cursor_advances() {
        let source = FakeSource::with(vec![Ok(json!({
            "homeworks": [{"homework_name": "hw1", "status": "approved"}],
            "current_date": 1000
        }))]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source.clone(), messenger.clone());

        assert_eq!(p.run_cycle().await, CycleOutcome::Delivered);

        let sends = messenger.sends();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].contains("hw1"));
        assert!(sends[0].contains(Verdict::Approved.description()));
        assert_eq!(source.calls(), vec![Cursor(500)]);
        assert_eq!(p.cursor(), Cursor(1000));
    }

    #[tokio::test]
    async fn only_first_homework_is_processed() {
        let source = FakeSource::with(vec![Ok(json!({
            "homeworks": [
                {"homework_name": "new", "status": "reviewing"},
                {"homework_name": "old", "status": "approved"}
            ],
            "current_date": 1000
        }))]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger.clone());

        p.run_cycle().await;

        let sends = messenger.sends();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].contains("\"new\""));
    }

    #[tokio::test]
    async fn empty_homeworks_sends_nothing() {
        let source = FakeSource::with(vec![Ok(json!({"homeworks": [], "current_date": 700}))]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger.clone());

        assert_eq!(p.run_cycle().await, CycleOutcome::NoUpdates);
        assert!(messenger.sends().is_empty());
        assert_eq!(p.cursor(), Cursor(700));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_homeworks_records_no_submissions_trace() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        // Current-thread runtime: the thread-local default covers the whole cycle.
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = FakeSource::with(vec![Ok(json!({"homeworks": [], "current_date": 700}))]);
        let mut p = poller(source, Arc::new(FakeMessenger::default()));
        p.run_cycle().await;

        assert!(
            logs.contents().contains("no new homework submissions"),
            "{}",
            logs.contents()
        );
    }

    async fn wait_for_calls(source: &FakeSource, n: usize) {
        for _ in 0..100 {
            if source.calls().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_sleeps_retry_period_then_retries_same_cursor() {
        let source = FakeSource::with(vec![Err(status_503()), Err(status_503())]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source.clone(), messenger.clone());
        let handle = tokio::spawn(async move { p.run().await });

        wait_for_calls(&source, 1).await;
        assert_eq!(source.calls(), vec![Cursor(500)]);

        tokio::time::advance(Duration::from_secs(599)).await;
        wait_for_calls(&source, 2).await;
        assert_eq!(source.calls().len(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        wait_for_calls(&source, 2).await;
        assert_eq!(source.calls(), vec![Cursor(500), Cursor(500)]);
        assert_eq!(messenger.sends().len(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn missing_current_date_keeps_cursor() {
        let source = FakeSource::with(vec![Ok(json!({"homeworks": []}))]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger);

        assert_eq!(p.run_cycle().await, CycleOutcome::NoUpdates);
        assert_eq!(p.cursor(), Cursor(500));
    }

    #[tokio::test]
    async fn unexpected_status_is_reported_and_cursor_kept() {
        let source = FakeSource::with(vec![Err(status_503())]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source.clone(), messenger.clone());

        let outcome = p.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Failed { reported: true, .. }));
        let sends = messenger.sends();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].starts_with("Program malfunction:"));
        assert!(sends[0].contains("503"));
        assert_eq!(p.cursor(), Cursor(500));

        // Next cycle retries with the same cursor.
        p.run_cycle().await;
        assert_eq!(source.calls(), vec![Cursor(500), Cursor(500)]);
    }

    #[tokio::test]
    async fn identical_consecutive_errors_notify_once() {
        let source = FakeSource::with(vec![Err(status_503()), Err(status_503())]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger.clone());

        let first = p.run_cycle().await;
        let second = p.run_cycle().await;

        assert!(matches!(first, CycleOutcome::Failed { reported: true, .. }));
        assert!(matches!(second, CycleOutcome::Failed { reported: false, .. }));
        assert_eq!(messenger.sends().len(), 1);
        assert!(p.last_error().is_some());
    }

    #[tokio::test]
    async fn different_errors_are_each_reported() {
        let source = FakeSource::with(vec![
            Err(status_503()),
            Err(Error::UpstreamApi("{\"error\":\"bad_request\"}".to_string())),
        ]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger.clone());

        p.run_cycle().await;
        p.run_cycle().await;

        let sends = messenger.sends();
        assert_eq!(sends.len(), 2);
        assert!(sends[1].contains("bad_request"));
    }

    #[tokio::test]
    async fn success_clears_error_marker() {
        let source = FakeSource::with(vec![
            Err(status_503()),
            Ok(json!({"homeworks": [], "current_date": 900})),
            Err(status_503()),
        ]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger.clone());

        p.run_cycle().await;
        p.run_cycle().await;
        assert!(p.last_error().is_none());
        p.run_cycle().await;

        assert_eq!(messenger.sends().len(), 2);
    }

    #[tokio::test]
    async fn validation_and_parse_failures_are_reported() {
        let source = FakeSource::with(vec![
            Ok(json!({"current_date": 1})),
            Ok(json!({"homeworks": [{"homework_name": "hw1", "status": "lost"}]})),
        ]);
        let messenger = Arc::new(FakeMessenger::default());
        let mut p = poller(source, messenger.clone());

        p.run_cycle().await;
        p.run_cycle().await;

        let sends = messenger.sends();
        assert_eq!(sends.len(), 2);
        assert!(sends[0].contains("homeworks"));
        assert!(sends[1].contains("lost"));
        assert_eq!(p.cursor(), Cursor(500));
    }

    #[tokio::test]
    async fn delivery_failure_keeps_cursor_for_resend() {
        let body = json!({
            "homeworks": [{"homework_name": "hw1", "status": "rejected"}],
            "current_date": 1000
        });
        let source = FakeSource::with(vec![Ok(body.clone()), Ok(body)]);
        let messenger = Arc::new(FakeMessenger::default());
        messenger.set_failing(true);
        let mut p = poller(source, messenger.clone());

        assert_eq!(p.run_cycle().await, CycleOutcome::DeliveryFailed);
        assert_eq!(p.cursor(), Cursor(500));

        messenger.set_failing(false);
        assert_eq!(p.run_cycle().await, CycleOutcome::Delivered);
        assert_eq!(p.cursor(), Cursor(1000));
        assert_eq!(messenger.sends().len(), 1);
    }
}
