use axum::{
    debug_handler,
    extract::{Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{AppResult, Event, viewer::Viewer};

use super::msg;

/// Whether `event` belongs on the socket `viewer` opened for `conversation_id`.
fn wanted(event: &Event, viewer: Uuid, conversation_id: Uuid) -> bool {
    match event {
        Event::Message { conversation_id: id, .. } => *id == conversation_id,
        Event::Notification { recipient, .. } => *recipient == viewer,
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn conversation_ws(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<Event>>,
    Viewer(viewer): Viewer,
    Path(conversation_id): Path<Uuid>,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    msg::require_participant(&db_pool, conversation_id, viewer).await?;

    Ok(ws
        .on_upgrade(async move |stream| {
            let mut rx = tx.subscribe();
            let (mut sender, mut receiver) = stream.split();

            let broadcast_task = tokio::spawn(async move {
                loop {
                    let event = match rx.recv().await {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "websocket subscriber lagging");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if !wanted(&event, viewer, conversation_id) {
                        continue;
                    }
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sender.send(text.into()).await.is_err() {
                        break;
                    }
                }
            });

            while let Some(Ok(frame)) = receiver.next().await {
                let Ok(outgoing) = serde_json::from_slice(&frame.into_data()) else {
                    continue;
                };
                if let Err(err) = msg::send_msg(&db_pool, &tx, viewer, conversation_id, outgoing).await {
                    debug!(error = %err.0, "websocket message refused");
                }
            }

            broadcast_task.abort();
        })
        .into_response())
}
