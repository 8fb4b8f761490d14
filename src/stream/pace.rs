//! Skip-ahead pacing for frame streams.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait adding skip-ahead pacing to a frame stream.
pub trait PaceExt: Stream {
    /// Emit at most one item per `period`, always the newest one seen.
    ///
    /// This is the stream form of the live cursor's latest-only contract:
    /// frames that arrive faster than the consumer's period are skipped, not
    /// queued, so a slow consumer watches current video instead of falling
    /// behind it. A quiet period delays delivery until the next item arrives;
    /// it never ends the stream.
    fn pace(self, period: Duration) -> Pace<Self>
    where
        Self: Sized,
    {
        Pace::new(self, period)
    }
}

impl<T: Stream> PaceExt for T {}

pin_project! {
    /// Stream combinator that delivers the newest item once per period.
    pub struct Pace<S: Stream> {
        #[pin]
        inner: S,
        ticker: Interval,
        newest: Option<S::Item>,
        done: bool,
    }
}

impl<S: Stream> Pace<S> {
    fn new(inner: S, period: Duration) -> Self {
        let mut ticker = interval(period);
        // A late consumer should not get a burst of make-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { inner, ticker, newest: None, done: false }
    }
}

impl<S: Stream> Stream for Pace<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.done {
            return Poll::Ready(this.newest.take());
        }

        loop {
            // Stash the newest item the source has ready.
            loop {
                match this.inner.as_mut().poll_next(cx) {
                    Poll::Ready(Some(item)) => *this.newest = Some(item),
                    Poll::Ready(None) => {
                        *this.done = true;
                        return Poll::Ready(this.newest.take());
                    }
                    Poll::Pending => break,
                }
            }

            ready!(this.ticker.poll_tick(cx));

            if this.newest.is_some() {
                return Poll::Ready(this.newest.take());
            }
            // Tick passed with nothing new: keep waiting on the source (or
            // the next tick) rather than ending or spinning.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn pace_keeps_only_the_newest_item() {
        let inner = futures::stream::iter(0..100);
        let mut paced = inner.pace(Duration::from_millis(5));

        // Everything is immediately available, so the first delivery is the
        // newest element and the stream then ends.
        assert_eq!(paced.next().await, Some(99));
        assert_eq!(paced.next().await, None);
    }

    #[tokio::test]
    async fn pace_respects_the_period() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u32>(16);
        let mut paced =
            tokio_stream::wrappers::ReceiverStream::new(rx).pace(Duration::from_millis(30));

        tokio::spawn(async move {
            for i in 0..6 {
                let _ = tx.send(i).await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let first = paced.next().await.expect("stream yields");
        let start = tokio::time::Instant::now();
        let second = paced.next().await.expect("stream yields again");
        assert!(second > first, "paced stream skips ahead, never backward");
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn quiet_source_does_not_end_the_stream() {
        let (tx, rx) = tokio::sync::mpsc::channel::<u32>(4);
        let mut paced =
            tokio_stream::wrappers::ReceiverStream::new(rx).pace(Duration::from_millis(5));

        tokio::spawn(async move {
            // Longer than several pacing periods.
            tokio::time::sleep(Duration::from_millis(40)).await;
            let _ = tx.send(7).await;
        });

        assert_eq!(paced.next().await, Some(7));
    }
}
