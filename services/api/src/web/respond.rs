//! services/api/src/web/respond.rs
//!
//! Turns a page-model outcome into an HTTP response: the page's current data
//! plus the notice to show, with the status of the failure when there was one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use research_navigator_core::domain::Notice;
use research_navigator_core::views::{Failure, ViewResult};
use serde::Serialize;

use crate::error::status_for;

#[derive(Serialize)]
pub struct ViewEnvelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<&'static str>,
    pub data: T,
    pub notice: Option<Notice>,
}

/// `data` is the page state after the call, which on failure is the state
/// from before it.
pub fn respond<T: Serialize>(
    page: Option<&'static str>,
    outcome: ViewResult,
    success: StatusCode,
    data: T,
) -> Response {
    let (status, notice) = match outcome {
        Ok(notice) => (success, notice),
        Err(Failure { notice, cause }) => (status_for(&cause), Some(notice)),
    };
    (status, Json(ViewEnvelope { page, data, notice })).into_response()
}
