//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the search page in the
//! browser and the API server.

use research_navigator_core::domain::{AdvancedSearchParams, Paper};
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The query box changed. A non-blank query is searched once typing
    /// pauses; a blank one cancels any pending search.
    Query { text: String },

    /// Opens or closes advanced mode, optionally replacing the form's fields.
    SetAdvanced {
        open: bool,
        #[serde(default)]
        params: Option<AdvancedSearchParams>,
    },

    /// Resets every advanced field to its default.
    ClearAdvanced,

    /// The search button: search right away.
    Submit,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A search request is in flight. The UI can show a loading state.
    Searching,

    /// The results of the latest search, replacing any shown before.
    Results { papers: Vec<Paper> },

    /// The input was rejected before any request was made.
    ValidationError { message: String },

    /// The search failed; the previous results stay on screen.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"query","text":"graph neural"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Query { text } if text == "graph neural"));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"set_advanced","open":true,"params":{"paperYear":"2021","keywords":["a","b"]}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::SetAdvanced { open, params } => {
                assert!(open);
                let params = params.unwrap();
                assert_eq!(params.paper_year, "2021");
                assert_eq!(params.keywords, vec!["a", "b"]);
            }
            other => panic!("unexpected message {other:?}"),
        }

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"set_advanced","open":false}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SetAdvanced { open: false, params: None }));
    }

    #[test]
    fn server_messages_serialize_with_type_tag() {
        let json = serde_json::to_value(ServerMessage::ValidationError {
            message: "Please enter a search query.".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "validation_error");
        assert_eq!(json["message"], "Please enter a search query.");

        let json = serde_json::to_value(ServerMessage::Searching).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "searching" }));
    }
}
