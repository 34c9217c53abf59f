use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::count_delivery;
use crate::models::notification::{Notification, NotificationKind};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: Uuid, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let handle = state.notifier.connect(user_id);
    let connection_id = handle.connection_id;
    let mut outbound = ReceiverStream::new(handle.receiver);

    state.metrics.connected_clients.inc();
    info!(user_id = %user_id, connection_id, "websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(notification) = outbound.next().await {
            let json = match serde_json::to_string(&notification) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize notification for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_message(&recv_state, user_id, &text),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    first_to_finish(send_task, recv_task).await;

    if state.notifier.disconnect(user_id, connection_id) {
        debug!(user_id = %user_id, connection_id, "connection unregistered");
    }
    state.metrics.connected_clients.dec();
    info!(user_id = %user_id, connection_id, "websocket client disconnected");
}

/// Waits for either half of the socket to finish, then stops the other so a
/// replaced or half-closed connection does not keep serving.
async fn first_to_finish(mut send_task: JoinHandle<()>, mut recv_task: JoinHandle<()>) {
    let loser = tokio::select! {
        _ = &mut send_task => recv_task,
        _ = &mut recv_task => send_task,
    };
    loser.abort();
    let _ = loser.await;
}

pub(crate) fn handle_client_message(state: &AppState, user_id: Uuid, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(user_id = %user_id, error = %err, "ignoring malformed client message");
            return;
        }
    };

    let ride_id = message
        .data
        .get("ride_id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok());

    match message.kind.as_str() {
        "subscribe_ride" => {
            let Some(ride_id) = ride_id else {
                debug!(user_id = %user_id, "subscribe_ride without a valid ride_id");
                return;
            };

            state.notifier.subscribe_to_ride(user_id, ride_id);
            let ack = Notification::new(
                NotificationKind::Subscribed,
                format!("Subscribed to ride {ride_id}"),
                json!({ "ride_id": ride_id }),
            );
            count_delivery(state, state.notifier.send_to_user(user_id, ack));
        }
        "location_update" => {
            let update = Notification::new(
                NotificationKind::DriverLocation,
                "Driver location updated",
                message.data,
            );

            if let Some(ride_id) = ride_id {
                for delivery in state.notifier.send_ride_update(ride_id, &update) {
                    count_delivery(state, delivery);
                }
            }
            count_delivery(state, state.notifier.send_to_user(user_id, update));
        }
        other => debug!(user_id = %user_id, kind = other, "ignoring unknown client message"),
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::json;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::{first_to_finish, handle_client_message};
    use crate::models::notification::{Notification, NotificationKind};
    use crate::state::AppState;

    fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn subscribe_ride_registers_and_acknowledges() {
        let state = AppState::new(8);
        let user = Uuid::new_v4();
        let ride = Uuid::new_v4();
        let mut rx = state.notifier.connect(user).receiver;

        let text = json!({ "type": "subscribe_ride", "data": { "ride_id": ride } }).to_string();
        handle_client_message(&state, user, &text);

        assert_eq!(state.notifier.ride_subscribers(ride), vec![user]);
        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, NotificationKind::Subscribed);
        assert_eq!(messages[0].data["ride_id"], ride.to_string());
    }

    #[test]
    fn subscribe_without_ride_id_is_ignored() {
        let state = AppState::new(8);
        let user = Uuid::new_v4();
        let mut rx = state.notifier.connect(user).receiver;

        handle_client_message(&state, user, r#"{"type":"subscribe_ride","data":{}}"#);
        handle_client_message(
            &state,
            user,
            r#"{"type":"subscribe_ride","data":{"ride_id":"not-a-uuid"}}"#,
        );

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn location_update_reaches_sender_and_ride_subscribers() {
        let state = AppState::new(8);
        let driver = Uuid::new_v4();
        let rider = Uuid::new_v4();
        let bystander = Uuid::new_v4();
        let ride = Uuid::new_v4();
        let mut driver_rx = state.notifier.connect(driver).receiver;
        let mut rider_rx = state.notifier.connect(rider).receiver;
        let mut bystander_rx = state.notifier.connect(bystander).receiver;
        state.notifier.subscribe_to_ride(rider, ride);

        let text = json!({
            "type": "location_update",
            "data": { "ride_id": ride, "latitude": 23.79, "longitude": 90.40 }
        })
        .to_string();
        handle_client_message(&state, driver, &text);

        let to_rider = drain(&mut rider_rx);
        assert_eq!(to_rider.len(), 1);
        assert_eq!(to_rider[0].kind, NotificationKind::DriverLocation);
        assert_eq!(to_rider[0].data["latitude"], 23.79);

        let echoed = drain(&mut driver_rx);
        assert_eq!(echoed.len(), 1);
        assert_eq!(echoed[0].kind, NotificationKind::DriverLocation);

        assert!(drain(&mut bystander_rx).is_empty());
    }

    #[test]
    fn unknown_and_malformed_messages_are_ignored() {
        let state = AppState::new(8);
        let user = Uuid::new_v4();
        let ride = Uuid::new_v4();
        let mut rx = state.notifier.connect(user).receiver;

        let unknown = json!({ "type": "teleport", "data": { "ride_id": ride } }).to_string();
        handle_client_message(&state, user, &unknown);
        handle_client_message(&state, user, "not json");

        assert!(drain(&mut rx).is_empty());
        assert!(state.notifier.ride_subscribers(ride).is_empty());
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn finished_half_stops_the_other() {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = SetOnDrop(stopped.clone());

        let finished = tokio::spawn(async {});
        let lingering = tokio::spawn(async move {
            let _flag = flag;
            pending::<()>().await;
        });

        first_to_finish(finished, lingering).await;

        assert!(stopped.load(Ordering::SeqCst));
    }
}
