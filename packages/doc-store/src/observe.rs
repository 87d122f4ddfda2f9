//! Subscriber bookkeeping for observed keys.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::{DocKey, Snapshot};

/// A live view of one or more keys.
///
/// The first item is the committed state at subscription time. After that,
/// exactly one item arrives per committed write that touched any observed
/// key, in commit order. Each item is restricted to the observed keys.
///
/// Dropping the observation detaches it; pending and future writes are not
/// affected. The stream ends only when the store itself is dropped.
pub struct Observation {
    rx: mpsc::UnboundedReceiver<Snapshot>,
}

impl Observation {
    /// Wait for the next snapshot.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// The next snapshot if one is already queued.
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Observation {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct Subscriber {
    keys: Vec<DocKey>,
    tx: mpsc::UnboundedSender<Snapshot>,
}

/// Registry of live observations. Callers hold the commit lock while using
/// it so that registration and delivery are ordered against commits.
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Vec<Subscriber>,
}

impl Subscribers {
    pub(crate) fn subscribe(&mut self, keys: &[DocKey], current: &Snapshot) -> Observation {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive in this scope, so the initial send cannot fail.
        let _ = tx.send(current.restrict(keys));
        self.entries.push(Subscriber {
            keys: keys.to_vec(),
            tx,
        });
        Observation { rx }
    }

    /// Deliver `committed` to every subscriber watching one of `touched`.
    pub(crate) fn notify(&mut self, committed: &Snapshot, touched: &[DocKey]) {
        self.entries.retain(|subscriber| {
            if subscriber.tx.is_closed() {
                return false;
            }
            if !subscriber.keys.iter().any(|key| touched.contains(key)) {
                return true;
            }
            subscriber
                .tx
                .send(committed.restrict(&subscriber.keys))
                .is_ok()
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc_key;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (DocKey::parse(k).unwrap(), v.to_string()))
            .collect()
    }

    #[test]
    fn subscribe_delivers_current_value_first() {
        let mut subscribers = Subscribers::default();
        let current = snapshot(&[("a", "1"), ("b", "2")]);

        let mut observation = subscribers.subscribe(&[doc_key!("a")], &current);
        let first = observation.try_recv().unwrap();
        assert_eq!(first, snapshot(&[("a", "1")]));
        assert!(observation.try_recv().is_none());
    }

    #[test]
    fn notify_only_reaches_interested_subscribers() {
        let mut subscribers = Subscribers::default();
        let empty = Snapshot::new();
        let mut watch_a = subscribers.subscribe(&[doc_key!("a")], &empty);
        let mut watch_b = subscribers.subscribe(&[doc_key!("b")], &empty);
        watch_a.try_recv();
        watch_b.try_recv();

        subscribers.notify(&snapshot(&[("a", "1"), ("b", "2")]), &[doc_key!("a")]);

        assert_eq!(watch_a.try_recv().unwrap(), snapshot(&[("a", "1")]));
        assert!(watch_b.try_recv().is_none());
    }

    #[test]
    fn dropped_observations_are_pruned() {
        let mut subscribers = Subscribers::default();
        let empty = Snapshot::new();
        let kept = subscribers.subscribe(&[doc_key!("a")], &empty);
        let dropped = subscribers.subscribe(&[doc_key!("a")], &empty);
        assert_eq!(subscribers.len(), 2);

        drop(dropped);
        subscribers.notify(&snapshot(&[("a", "1")]), &[doc_key!("a")]);
        assert_eq!(subscribers.len(), 1);
        drop(kept);
    }

    #[test]
    fn every_notification_is_delivered_in_order() {
        let mut subscribers = Subscribers::default();
        let mut observation = subscribers.subscribe(&[doc_key!("a")], &Snapshot::new());
        assert!(observation.try_recv().unwrap().is_empty());

        for i in 0..5 {
            let value = i.to_string();
            subscribers.notify(&snapshot(&[("a", value.as_str())]), &[doc_key!("a")]);
        }

        for i in 0..5 {
            let next = observation.try_recv().unwrap();
            assert_eq!(next.get(&doc_key!("a")), Some(i.to_string().as_str()));
        }
    }
}
