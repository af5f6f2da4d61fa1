//! Change notifications and live lists.
//!
//! Writes publish a table-scoped event (operation only, no row payload) to
//! a shared hub; consumers treat it purely as a refetch trigger. One
//! broadcast channel per table is shared by all interested consumers and
//! reclaimed once the last of them is gone.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;

use super::resource::ResourceError;
use crate::services::metrics;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: &'static str,
    pub op: ChangeOp,
}

/// Per-table subscription registry shared by every live list and
/// WebSocket client.
#[derive(Default)]
pub struct ChangeHub {
    channels: Mutex<HashMap<&'static str, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table: &'static str) -> broadcast::Receiver<ChangeEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(table)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub fn publish(&self, event: ChangeEvent) {
        metrics::CHANGE_EVENTS
            .with_label_values(&[event.table])
            .inc();
        let mut channels = self.channels.lock().unwrap();
        if let Some(tx) = channels.get(event.table) {
            if tx.send(event).is_err() {
                // Last subscriber is gone; reclaim the channel.
                channels.remove(event.table);
            }
        }
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, |tx| tx.receiver_count())
    }
}

/// List hook state machine: Loading → Ready | Errored, back through
/// Loading (or silently, see `LiveListOptions`) on every change event.
#[derive(Debug, Clone, PartialEq)]
pub enum ListState<T> {
    Loading,
    Ready(Vec<T>),
    /// A failed (re)fetch keeps the last-known rows so the caller never
    /// blanks an already-rendered list.
    Errored { message: String, stale: Vec<T> },
}

impl<T> ListState<T> {
    pub fn rows(&self) -> &[T] {
        match self {
            ListState::Loading => &[],
            ListState::Ready(rows) => rows,
            ListState::Errored { stale, .. } => stale,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ListState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ListState::Errored { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LiveListOptions {
    /// When true, every background refetch passes through Loading again,
    /// as the original list behaved; when false the previous rows stay
    /// visible until the refetch resolves.
    pub loading_on_refresh: bool,
}

impl Default for LiveListOptions {
    fn default() -> Self {
        Self {
            loading_on_refresh: false,
        }
    }
}

/// A self-refreshing list over a fetch function. The background task is
/// aborted when the handle is dropped, so a late response can never reach
/// a consumer that no longer exists.
pub struct LiveList<T> {
    state: watch::Receiver<ListState<T>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T> Drop for LiveList<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T: Clone + Send + Sync + 'static> LiveList<T> {
    pub fn spawn<F, Fut>(
        hub: &ChangeHub,
        table: &'static str,
        options: LiveListOptions,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, ResourceError>> + Send,
    {
        // Subscribe before the first fetch so no event can slip between.
        let mut events = hub.subscribe(table);
        let (tx, rx) = watch::channel(ListState::Loading);
        let refresh = Arc::new(Notify::new());
        let refresh_signal = refresh.clone();

        let task = tokio::spawn(async move {
            loop {
                match fetch().await {
                    Ok(rows) => {
                        let _ = tx.send(ListState::Ready(rows));
                    }
                    Err(err) => {
                        let stale = tx.borrow().rows().to_vec();
                        let _ = tx.send(ListState::Errored {
                            message: err.to_string(),
                            stale,
                        });
                    }
                }

                tokio::select! {
                    event = events.recv() => match event {
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = refresh_signal.notified() => {}
                }

                if options.loading_on_refresh {
                    let _ = tx.send(ListState::Loading);
                }
            }
        });

        Self {
            state: rx,
            refresh,
            task,
        }
    }

    pub fn state(&self) -> ListState<T> {
        self.state.borrow().clone()
    }

    /// A watch receiver for consumers that want to await state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ListState<T>> {
        self.state.clone()
    }

    /// Manual refetch, equivalent to a change event for this list only.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout};

    type Script = mpsc::UnboundedSender<Result<Vec<i32>, ResourceError>>;
    type BoxedFetch =
        std::pin::Pin<Box<dyn Future<Output = Result<Vec<i32>, ResourceError>> + Send>>;

    /// A fetch function that pops scripted results one per call, waiting
    /// until the test provides the next one.
    fn scripted_fetch() -> (Script, impl Fn() -> BoxedFetch + Send + 'static) {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let fetch = move || -> BoxedFetch {
            let rx = rx.clone();
            Box::pin(async move {
                rx.lock().await.recv().await.expect("fetch script exhausted")
            })
        };
        (tx, fetch)
    }

    async fn wait_ready(rx: &mut watch::Receiver<ListState<i32>>, expected: &[i32]) {
        timeout(Duration::from_secs(5), rx.wait_for(|s| s.rows() == expected && !s.is_loading()))
            .await
            .expect("timed out waiting for state")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn hub_delivers_one_event_to_every_subscriber() {
        let hub = ChangeHub::new();
        let mut a = hub.subscribe("zajecia");
        let mut b = hub.subscribe("zajecia");
        let mut c = hub.subscribe("zajecia");
        assert_eq!(hub.subscriber_count("zajecia"), 3);

        let event = ChangeEvent {
            table: "zajecia",
            op: ChangeOp::Insert,
        };
        hub.publish(event);

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
        assert_eq!(c.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn hub_is_scoped_per_table() {
        let hub = ChangeHub::new();
        let mut classes = hub.subscribe("zajecia");
        let mut payments = hub.subscribe("platnosci");

        hub.publish(ChangeEvent {
            table: "zajecia",
            op: ChangeOp::Delete,
        });

        assert_eq!(classes.recv().await.unwrap().table, "zajecia");
        assert!(payments.try_recv().is_err());
    }

    #[tokio::test]
    async fn hub_reclaims_channel_after_last_subscriber_drops() {
        let hub = ChangeHub::new();
        let rx = hub.subscribe("linki");
        assert_eq!(hub.subscriber_count("linki"), 1);
        drop(rx);

        // First publish notices the dead channel and reclaims it.
        hub.publish(ChangeEvent {
            table: "linki",
            op: ChangeOp::Insert,
        });
        assert_eq!(hub.subscriber_count("linki"), 0);
    }

    #[tokio::test]
    async fn live_list_loads_then_refetches_on_change() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let list = LiveList::spawn(&hub, "uczniowie", LiveListOptions::default(), fetch);
        let mut state = list.subscribe_state();

        script.send(Ok(vec![1])).unwrap();
        wait_ready(&mut state, &[1]).await;

        hub.publish(ChangeEvent {
            table: "uczniowie",
            op: ChangeOp::Insert,
        });
        script.send(Ok(vec![1, 2])).unwrap();
        wait_ready(&mut state, &[1, 2]).await;
    }

    #[tokio::test]
    async fn one_event_fans_out_to_all_live_lists() {
        let hub = Arc::new(ChangeHub::new());
        let mut lists = Vec::new();
        let mut scripts = Vec::new();
        for _ in 0..3 {
            let (script, fetch) = scripted_fetch();
            let list = LiveList::spawn(&hub, "platnosci", LiveListOptions::default(), fetch);
            script.send(Ok(vec![10])).unwrap();
            scripts.push(script);
            lists.push(list);
        }
        for list in &lists {
            let mut rx = list.subscribe_state();
            wait_ready(&mut rx, &[10]).await;
        }

        // One event: every instance independently refetches and converges.
        hub.publish(ChangeEvent {
            table: "platnosci",
            op: ChangeOp::Update,
        });
        for script in &scripts {
            script.send(Ok(vec![10, 20])).unwrap();
        }
        for list in &lists {
            let mut rx = list.subscribe_state();
            wait_ready(&mut rx, &[10, 20]).await;
            assert_eq!(list.state(), ListState::Ready(vec![10, 20]));
        }
    }

    #[tokio::test]
    async fn failed_refetch_keeps_stale_rows() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let list = LiveList::spawn(&hub, "zajecia", LiveListOptions::default(), fetch);
        let mut state = list.subscribe_state();

        script.send(Ok(vec![7, 8])).unwrap();
        wait_ready(&mut state, &[7, 8]).await;

        hub.publish(ChangeEvent {
            table: "zajecia",
            op: ChangeOp::Delete,
        });
        script
            .send(Err(ResourceError::Backend("Błąd pobierania zajęć".into())))
            .unwrap();

        let errored = timeout(
            Duration::from_secs(5),
            state.wait_for(|s| s.error().is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(errored.rows(), &[7, 8]);
        assert_eq!(errored.error(), Some("Błąd pobierania zajęć"));
    }

    #[tokio::test]
    async fn first_load_failure_has_no_stale_rows() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let list = LiveList::spawn(&hub, "diagnozy", LiveListOptions::default(), fetch);
        let mut state = list.subscribe_state();

        script
            .send(Err(ResourceError::Backend("Błąd pobierania danych".into())))
            .unwrap();
        let errored = timeout(
            Duration::from_secs(5),
            state.wait_for(|s| s.error().is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert!(errored.rows().is_empty());
    }

    #[tokio::test]
    async fn loading_on_refresh_reenters_loading() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let options = LiveListOptions {
            loading_on_refresh: true,
        };
        let list = LiveList::spawn(&hub, "ksiazki", options, fetch);
        let mut state = list.subscribe_state();

        script.send(Ok(vec![1])).unwrap();
        wait_ready(&mut state, &[1]).await;

        // Fetch is now pending (script empty), so Loading is observable.
        hub.publish(ChangeEvent {
            table: "ksiazki",
            op: ChangeOp::Insert,
        });
        timeout(Duration::from_secs(5), state.wait_for(|s| s.is_loading()))
            .await
            .unwrap()
            .unwrap();

        script.send(Ok(vec![1, 2])).unwrap();
        wait_ready(&mut state, &[1, 2]).await;
    }

    #[tokio::test]
    async fn silent_refresh_never_reenters_loading() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let list = LiveList::spawn(&hub, "ksiazki", LiveListOptions::default(), fetch);
        let mut state = list.subscribe_state();

        script.send(Ok(vec![1])).unwrap();
        wait_ready(&mut state, &[1]).await;

        hub.publish(ChangeEvent {
            table: "ksiazki",
            op: ChangeOp::Insert,
        });
        // Even with the refetch pending, the old rows stay visible.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(list.state(), ListState::Ready(vec![1]));

        script.send(Ok(vec![1, 2])).unwrap();
        wait_ready(&mut state, &[1, 2]).await;
    }

    #[tokio::test]
    async fn manual_refresh_triggers_refetch_without_an_event() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let list = LiveList::spawn(&hub, "linki", LiveListOptions::default(), fetch);
        let mut state = list.subscribe_state();

        script.send(Ok(vec![3])).unwrap();
        wait_ready(&mut state, &[3]).await;

        list.refresh();
        script.send(Ok(vec![3, 4])).unwrap();
        wait_ready(&mut state, &[3, 4]).await;
    }

    #[tokio::test]
    async fn dropping_the_list_aborts_its_task_and_unsubscribes() {
        let hub = Arc::new(ChangeHub::new());
        let (script, fetch) = scripted_fetch();
        let list = LiveList::spawn(&hub, "auth_settings", LiveListOptions::default(), fetch);
        script.send(Ok(vec![1])).unwrap();
        assert_eq!(hub.subscriber_count("auth_settings"), 1);

        drop(list);
        // Abort is asynchronous; poll until the receiver is gone.
        for _ in 0..50 {
            if hub.subscriber_count("auth_settings") == 0 {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("live list subscription survived drop");
    }
}
