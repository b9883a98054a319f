use std::time::Duration;

use tokio::sync::watch;

use crate::error::ProviderError;

/// Fires every [`CancelSignal`] created from it. Dropping it without calling
/// [`Canceller::cancel`] leaves the signals pending forever.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

pub fn cancel_pair() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelSignal { rx: Some(rx) })
}

impl CancelSignal {
    pub const fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the paired [`Canceller`] fires.
    pub async fn cancelled(&self) {
        if let Some(rx) = &self.rx {
            let mut rx = rx.clone();
            let fired = rx.wait_for(|fired| *fired).await.is_ok();
            if fired {
                return;
            }
        }
        std::future::pending::<()>().await;
    }

    /// Sleeps for `duration` unless cancelled first, in which case the
    /// error names `stage`.
    pub async fn sleep(&self, duration: Duration, stage: &'static str) -> Result<(), ProviderError> {
        if self.is_cancelled() {
            return Err(ProviderError::Cancelled { stage });
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            () = self.cancelled() => Err(ProviderError::Cancelled { stage }),
        }
    }
}
