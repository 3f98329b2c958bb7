use tokio::sync::watch;

/// Creates a new shutdown channel.
///
/// Every clone of the returned [`ShutdownRx`] observes the signal, also clones that
/// start waiting after it was sent.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);

    (ShutdownTx(tx), ShutdownRx(rx))
}

/// Sending half of the process shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Signals shutdown to every receiver. Sending more than once is a no-op.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// Receiving half of the process shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Resolves once shutdown was signalled or every sender was dropped.
    pub async fn wait_for_shutdown(&mut self) {
        let _ = self.0.wait_for(|shutdown| *shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn receivers_observe_shutdown_sent_before_waiting() {
        let (tx, rx) = create_shutdown_channel();
        tx.shutdown();
        tx.shutdown();

        let mut late = rx.clone();
        timeout(Duration::from_secs(1), late.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiting_blocks_until_shutdown_is_sent() {
        let (tx, mut rx) = create_shutdown_channel();

        assert!(
            timeout(Duration::from_millis(20), rx.wait_for_shutdown())
                .await
                .is_err()
        );

        tx.shutdown();
        timeout(Duration::from_secs(1), rx.wait_for_shutdown())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waiting_resolves_when_senders_are_dropped() {
        let (tx, mut rx) = create_shutdown_channel();
        drop(tx);

        timeout(Duration::from_secs(1), rx.wait_for_shutdown())
            .await
            .unwrap();
    }
}
