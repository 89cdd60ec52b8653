//! services/api/src/web/search_socket.rs
//!
//! The live search connection behind the search page. Typing is debounced
//! into searches; the search button runs one right away.

use crate::web::{
    debounce::Debouncer,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, UserSession},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{stream::StreamExt, SinkExt};
use research_navigator_core::ports::{DataStore, PortError};
use research_navigator_core::views::Failure;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Replies waiting to be written to the socket.
type Outbox = mpsc::Sender<ServerMessage>;

const OUTBOX_CAPACITY: usize = 32;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn search_socket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, session))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, session: Arc<UserSession>) {
    info!("Search connection opened for user {}", session.user.user_id);

    // Replies from the receive loop and from debounced searches share one
    // queue; a single writer task owns the socket's sending half.
    let (mut sink, mut receiver) = socket.split();
    let (outbox, mut outgoing) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);
    let writer = tokio::spawn(async move {
        while let Some(msg) = outgoing.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                warn!("Failed to send message; the client has gone away.");
                break;
            }
        }
    });
    let mut debouncer = Debouncer::new(app_state.config.search_debounce);

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text_message(text.as_str(), &app_state, &session, &outbox, &mut debouncer)
                    .await;
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Search connection error: {}", e);
                break;
            }
        }
    }

    debouncer.cancel();
    writer.abort();
    info!("Search connection closed for user {}", session.user.user_id);
}

async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    session: &Arc<UserSession>,
    outbox: &Outbox,
    debouncer: &mut Debouncer,
) {
    let client_msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse client message: {}", e);
            send(
                outbox,
                ServerMessage::Error {
                    message: "Malformed message".to_string(),
                },
            )
            .await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Query { text } => {
            let auto_search = {
                let mut view = session.search.lock().await;
                view.set_query(text);
                view.should_auto_search()
            };
            if auto_search {
                debouncer.schedule(run_search(
                    app_state.clone(),
                    session.clone(),
                    outbox.clone(),
                ));
            } else {
                debouncer.cancel();
            }
        }
        ClientMessage::SetAdvanced { open, params } => {
            let mut view = session.search.lock().await;
            view.set_advanced_open(open);
            if let Some(params) = params {
                view.set_advanced(params);
            }
        }
        ClientMessage::ClearAdvanced => {
            session.search.lock().await.clear_advanced();
        }
        ClientMessage::Submit => {
            debouncer.cancel();
            run_search(app_state.clone(), session.clone(), outbox.clone()).await;
        }
    }
}

/// Runs the search page's current query and reports the outcome.
async fn run_search(app_state: Arc<AppState>, session: Arc<UserSession>, outbox: Outbox) {
    let who = session.identity().await;
    let recorder: &dyn DataStore = app_state.store.as_ref();
    let history = app_state
        .config
        .record_search_history
        .then_some((recorder, &who));

    let mut view = session.search.lock().await;
    if view.validate().is_ok() {
        send(&outbox, ServerMessage::Searching).await;
    }

    let reply = match view.search(app_state.papers.as_ref(), history).await {
        Ok(_) => ServerMessage::Results {
            papers: view.papers().to_vec(),
        },
        Err(Failure {
            notice,
            cause: PortError::Validation(_),
        }) => ServerMessage::ValidationError {
            message: notice.message,
        },
        Err(Failure { notice, .. }) => ServerMessage::Error {
            message: notice.message,
        },
    };
    drop(view);

    send(&outbox, reply).await;
}

async fn send(outbox: &Outbox, msg: ServerMessage) {
    if outbox.send(msg).await.is_err() {
        warn!("Dropped a reply; the search connection is closing.");
    }
}
