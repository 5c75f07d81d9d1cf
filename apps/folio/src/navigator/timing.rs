//! Transition timing. The transition-finished signal is the primary path;
//! each fixed duration is only the fallback for when no signal arrives.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

/// Hide transition of the outgoing section before swapping to another.
pub const SECTION_HIDE_FALLBACK: Duration = Duration::from_millis(700);
/// Fade/slide of the section overlay when returning to the hero view.
pub const HOME_FADE: Duration = Duration::from_millis(900);
/// Delay between hiding the overlay and clearing the injected subtree.
pub const HOME_CLEAR: Duration = Duration::from_millis(500);
/// Length of the glitch animation on re-rendered text.
pub const GLITCH: Duration = Duration::from_millis(600);
/// Lifetime of a toast notification.
pub const TOAST: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub section_hide_fallback: Duration,
    pub home_fade: Duration,
    pub home_clear: Duration,
    pub glitch: Duration,
    pub toast: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            section_hide_fallback: SECTION_HIDE_FALLBACK,
            home_fade: HOME_FADE,
            home_clear: HOME_CLEAR,
            glitch: GLITCH,
            toast: TOAST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEnd {
    Signalled,
    TimedOut,
}

/// Waits for `signal` or `fallback`, whichever comes first. A dropped
/// sender counts as no signal and falls through to the timeout.
pub async fn wait_for_transition(
    signal: Option<oneshot::Receiver<()>>,
    fallback: Duration,
) -> TransitionEnd {
    let Some(mut signal) = signal else {
        tokio::time::sleep(fallback).await;
        return TransitionEnd::TimedOut;
    };
    let sleep = tokio::time::sleep(fallback);
    tokio::pin!(sleep);
    let mut signal_open = true;
    loop {
        tokio::select! {
            result = &mut signal, if signal_open => {
                if result.is_ok() {
                    debug!("Transition finished by signal");
                    return TransitionEnd::Signalled;
                }
                signal_open = false;
            }
            _ = &mut sleep => {
                debug!("Transition fallback after {}ms", fallback.as_millis());
                return TransitionEnd::TimedOut;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_signal_short_circuits_fallback() {
        let (tx, rx) = oneshot::channel();
        let start = Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(());
        });
        let end = wait_for_transition(Some(rx), SECTION_HIDE_FALLBACK).await;
        assert_eq!(end, TransitionEnd::Signalled);
        assert!(start.elapsed() < SECTION_HIDE_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_signal_waits_for_fallback() {
        let start = Instant::now();
        assert_eq!(
            wait_for_transition(None, SECTION_HIDE_FALLBACK).await,
            TransitionEnd::TimedOut
        );
        assert!(start.elapsed() >= SECTION_HIDE_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sender_falls_back_to_timeout() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        let start = Instant::now();
        assert_eq!(
            wait_for_transition(Some(rx), SECTION_HIDE_FALLBACK).await,
            TransitionEnd::TimedOut
        );
        assert!(start.elapsed() >= SECTION_HIDE_FALLBACK);
    }
}
