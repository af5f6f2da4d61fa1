//! WebSocket change feed.
//!
//! `subscribe` delivers bare refetch triggers (table + operation, no row
//! payload). `watch` additionally runs a live list server-side and pushes
//! the full refreshed rows after every change.

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    middleware::auth::decode_access_token,
    models::auth::AuthenticatedUser,
    store::{
        known_table,
        live::{ListState, LiveList, LiveListOptions},
        Filters,
    },
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { table: String },
    Unsubscribe { table: String },
    Watch { table: String, student_id: Option<Uuid> },
    Unwatch { table: String },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
) -> Response {
    let auth_user = decode_access_token(&params.token, &state.config.jwt_secret);

    ws.on_upgrade(move |socket| async move {
        match auth_user {
            Ok(user) => {
                info!("WebSocket connected: user={}", user.user_id);
                handle_socket(socket, state, user).await;
            }
            Err(e) => {
                error!("WebSocket auth failed: {}", e);
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, user: AuthenticatedUser) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    let mut triggers: HashMap<&'static str, JoinHandle<()>> = HashMap::new();
    let mut watches: HashMap<&'static str, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => {
                let Some(msg) = outgoing else { break };
                if sender.send(Message::Text(msg.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                let Some(Ok(msg)) = incoming else { break };
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(command) => handle_command(
                            command, &state, &user, &out_tx, &mut triggers, &mut watches,
                        ),
                        Err(_) => send_error(&out_tx, "Unknown action"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    for (_, task) in triggers.drain() {
        task.abort();
    }
    for (_, task) in watches.drain() {
        task.abort();
    }
    info!("WebSocket disconnected: user={}", user.user_id);
}

fn send_error(out: &mpsc::Sender<String>, message: &str) {
    let _ = out.try_send(json!({ "type": "error", "message": message }).to_string());
}

fn handle_command(
    command: ClientMessage,
    state: &AppState,
    user: &AuthenticatedUser,
    out: &mpsc::Sender<String>,
    triggers: &mut HashMap<&'static str, JoinHandle<()>>,
    watches: &mut HashMap<&'static str, JoinHandle<()>>,
) {
    match command {
        ClientMessage::Subscribe { table } => {
            let Some(table) = known_table(&table) else {
                return send_error(out, "Unknown table");
            };
            let task = spawn_trigger(state, table, out.clone());
            if let Some(previous) = triggers.insert(table, task) {
                previous.abort();
            }
        }
        ClientMessage::Unsubscribe { table } => {
            if let Some(table) = known_table(&table) {
                if let Some(task) = triggers.remove(table) {
                    task.abort();
                }
            }
        }
        ClientMessage::Watch { table, student_id } => {
            let Some(table) = known_table(&table) else {
                return send_error(out, "Unknown table");
            };
            // Watching pushes row payloads, so it stays staff-only;
            // everyone may watch their own auth settings.
            if table != "auth_settings" && !user.capabilities().is_staff {
                return send_error(out, "Brak uprawnień");
            }
            let task = start_watch(state, user, table, student_id, out.clone());
            if let Some(previous) = watches.insert(table, task) {
                previous.abort();
            }
        }
        ClientMessage::Unwatch { table } => {
            if let Some(table) = known_table(&table) {
                if let Some(task) = watches.remove(table) {
                    task.abort();
                }
            }
        }
    }
}

/// Forward raw change events for one table until the socket goes away.
fn spawn_trigger(
    state: &AppState,
    table: &'static str,
    out: mpsc::Sender<String>,
) -> JoinHandle<()> {
    let mut events = state.hub.subscribe(table);
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let msg = json!({ "type": "change", "table": event.table, "op": event.op });
                    if out.send(msg.to_string()).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn start_watch(
    state: &AppState,
    user: &AuthenticatedUser,
    table: &'static str,
    student_id: Option<Uuid>,
    out: mpsc::Sender<String>,
) -> JoinHandle<()> {
    let options = LiveListOptions::default();
    let mut filters = Filters::new();
    if let Some(id) = student_id {
        // Ignored by resources that do not filter on student_id.
        filters = filters.eq("student_id", id);
    }

    let store = &state.store;
    match table {
        "uczniowie" => spawn_watch(store.students.watch(filters, options), table, out),
        "zajecia" => spawn_watch(store.classes.watch(filters, options), table, out),
        "platnosci" => spawn_watch(store.payments.watch(filters, options), table, out),
        "diagnozy" => spawn_watch(store.diagnostics.watch(filters, options), table, out),
        "ksiazki" => spawn_watch(store.books.watch(filters, options), table, out),
        "uczen_ksiazka" => spawn_watch(store.student_books.watch(filters, options), table, out),
        "linki" => spawn_watch(store.links.watch(filters, options), table, out),
        _ => spawn_watch(
            store
                .auth_settings
                .watch(Filters::new().eq("user_id", user.user_id), options),
            table,
            out,
        ),
    }
}

/// Push every non-loading state of a live list to the client. Dropping
/// the task drops the list, which unsubscribes it from the hub.
fn spawn_watch<T>(list: LiveList<T>, table: &'static str, out: mpsc::Sender<String>) -> JoinHandle<()>
where
    T: serde::Serialize + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut state = list.subscribe_state();
        loop {
            let payload = {
                let current = state.borrow_and_update();
                match &*current {
                    ListState::Loading => None,
                    ListState::Ready(rows) => {
                        Some(json!({ "type": "snapshot", "table": table, "rows": rows }))
                    }
                    ListState::Errored { message, stale } => Some(json!({
                        "type": "snapshot_error",
                        "table": table,
                        "error": message,
                        "rows": stale,
                    })),
                }
            };
            if let Some(payload) = payload {
                if out.send(payload.to_string()).await.is_err() {
                    break;
                }
            }
            if state.changed().await.is_err() {
                break;
            }
        }
    })
}
