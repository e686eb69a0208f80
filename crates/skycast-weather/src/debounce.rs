//! Trailing-edge debouncer for the search field.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Default quiet period before a search fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Holds at most one pending action. Scheduling replaces the pending one;
/// only the last call in a window fires, with its own argument.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<CancellationToken>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action(term)` after the configured delay.
    pub fn schedule<F, Fut>(&mut self, term: impl Into<String>, action: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.schedule_with_delay(term, self.delay, action);
    }

    /// Schedule with a one-off delay.
    pub fn schedule_with_delay<F, Fut>(&mut self, term: impl Into<String>, delay: Duration, action: F)
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let term = term.into();
        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        tracing::debug!("Debouncing '{}' for {:?}", term, delay);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::trace!("Debounced action for '{}' cancelled", term);
                }
                _ = tokio::time::sleep(delay) => {
                    // Cancelling the token from here on has no effect.
                    action(term).await;
                }
            }
        });
    }

    /// Drop the pending action, if any. Actions that already fired keep running.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn recorder() -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        mpsc::unbounded_channel()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(term) = rx.try_recv() {
            out.push(term);
        }
        out
    }

    fn send_to(tx: &mpsc::UnboundedSender<String>) -> impl FnOnce(String) -> std::future::Ready<()> {
        let tx = tx.clone();
        move |term| {
            let _ = tx.send(term);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_term() {
        let (tx, mut rx) = recorder();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));

        for term in ["b", "be", "ber", "berl", "berlin"] {
            debouncer.schedule(term, send_to(&tx));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(drain(&mut rx), vec!["berlin".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_fires_before_delay() {
        let (tx, mut rx) = recorder();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));

        debouncer.schedule("oslo", send_to(&tx));
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(drain(&mut rx).is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(drain(&mut rx), vec!["oslo".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending() {
        let (tx, mut rx) = recorder();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));

        debouncer.schedule("paris", send_to(&tx));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_each_fire() {
        let (tx, mut rx) = recorder();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));

        debouncer.schedule("rome", send_to(&tx));
        tokio::time::sleep(Duration::from_millis(700)).await;
        debouncer.schedule("milan", send_to(&tx));
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(drain(&mut rx), vec!["rome".to_string(), "milan".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_delay_override() {
        let (tx, mut rx) = recorder();
        let mut debouncer = SearchDebouncer::new(Duration::from_secs(10));

        debouncer.schedule_with_delay("kyiv", Duration::from_millis(50), send_to(&tx));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(drain(&mut rx), vec!["kyiv".to_string()]);
        assert_eq!(debouncer.delay(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_action_is_not_aborted() {
        let (tx, mut rx) = recorder();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(500));

        let slow_tx = tx.clone();
        debouncer.schedule("lima", move |term| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = slow_tx.send(term);
        });
        // Fired at 500ms, still running its own sleep.
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.schedule("quito", send_to(&tx));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(drain(&mut rx), vec!["lima".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (tx, mut rx) = recorder();
        {
            let mut debouncer = SearchDebouncer::default();
            debouncer.schedule("cairo", send_to(&tx));
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(drain(&mut rx).is_empty());
    }
}
