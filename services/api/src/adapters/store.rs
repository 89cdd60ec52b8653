//! services/api/src/adapters/store.rs
//!
//! This module contains the hosted-store adapter, which is the concrete
//! implementation of the `DataStore` port from the `core` crate. It talks to the
//! store's REST data API (`{SUPABASE_URL}/rest/v1`) with `reqwest`, one HTTPS
//! request per call, authenticated as the calling user so row-level security
//! scopes every query.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use research_navigator_core::domain::{
    Folder, FolderUpdate, Identity, NewFolder, NewProfile, Profile, ProfileUpdate, SearchFilters,
    SearchHistoryEntry,
};
use research_navigator_core::ports::{DataStore, PortError, PortResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

const PROFILES: &str = "profiles";
const FOLDERS: &str = "folders";
const SEARCH_HISTORY: &str = "search_history";

/// Asks the data API for a single JSON object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// The data API's code for "zero rows where one was requested".
const NO_ROWS: &str = "PGRST116";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A store adapter that implements the `DataStore` port.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    anon_key: String,
}

impl SupabaseStore {
    /// Creates a new `SupabaseStore` for the project at `supabase_url`.
    pub fn new(client: Client, supabase_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client,
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    fn request(&self, method: Method, table: &str, who: &Identity) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(&who.access_token)
    }

    fn returning_one(builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGLE_OBJECT)
    }
}

//=========================================================================================
// Error Normalization
//=========================================================================================

#[derive(Debug, Clone, Copy)]
enum Op {
    Read,
    Write,
}

impl Op {
    fn failed(self, message: String) -> PortError {
        match self {
            Op::Read => PortError::RemoteRead(message),
            Op::Write => PortError::RemoteWrite(message),
        }
    }
}

/// The data API's JSON error body.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn classify(status: StatusCode, body: &ApiErrorBody, op: Op, what: &str) -> PortError {
    if status == StatusCode::UNAUTHORIZED {
        return PortError::Unauthorized;
    }
    let no_rows = status == StatusCode::NOT_ACCEPTABLE || body.code.as_deref() == Some(NO_ROWS);
    match (op, no_rows) {
        (Op::Read, true) => PortError::NotFound(format!("{what}: no matching row")),
        (Op::Write, true) => PortError::RemoteWrite(format!("{what}: no row matched")),
        _ => {
            let detail = body
                .message
                .clone()
                .or_else(|| body.details.clone())
                .unwrap_or_else(|| status.to_string());
            op.failed(format!("{what}: {detail}"))
        }
    }
}

/// Sends the request and returns the response if it succeeded; otherwise logs
/// the failure and returns it normalized.
async fn send(builder: RequestBuilder, op: Op, what: &str) -> PortResult<Response> {
    let response = builder.send().await.map_err(|e| {
        error!("Error during {}: {}", what, e);
        op.failed(format!("{what}: {e}"))
    })?;

    let status = response.status();
    if status.is_success() {
        debug!("{} succeeded with {}", what, status);
        return Ok(response);
    }

    let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
    let err = classify(status, &body, op, what);
    error!("Error during {} ({}): {}", what, status, err);
    Err(err)
}

async fn decode<T: DeserializeOwned>(response: Response, op: Op, what: &str) -> PortResult<T> {
    response.json::<T>().await.map_err(|e| {
        error!("Malformed response during {}: {}", what, e);
        op.failed(format!("{what}: malformed response: {e}"))
    })
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

//=========================================================================================
// Row and Payload Structs
//=========================================================================================

#[derive(Deserialize)]
struct ProfileRecord {
    id: Uuid,
    user_id: Uuid,
    name: Option<String>,
    dob: Option<NaiveDate>,
    currently_pursuing: Option<String>,
    interests: Option<Vec<String>>,
    phone: Option<String>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            user_id: self.user_id,
            name: self.name.unwrap_or_default(),
            dob: self.dob,
            currently_pursuing: self.currently_pursuing.unwrap_or_default(),
            interests: self.interests.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct ProfileInsert {
    user_id: Uuid,
    name: String,
    dob: Option<NaiveDate>,
    currently_pursuing: String,
    interests: Vec<String>,
    phone: String,
}

#[derive(Deserialize)]
struct FolderRecord {
    id: Uuid,
    user_id: Uuid,
    name: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}
impl FolderRecord {
    fn to_domain(self) -> Folder {
        Folder {
            id: self.id,
            user_id: self.user_id,
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize)]
struct FolderInsert<'a> {
    user_id: Uuid,
    name: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct SearchHistoryRecord {
    id: Uuid,
    user_id: Uuid,
    query: String,
    filters: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}
impl SearchHistoryRecord {
    fn to_domain(self) -> SearchHistoryEntry {
        let filters = match self.filters {
            Some(serde_json::Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => (key, s),
                    other => (key, other.to_string()),
                })
                .collect(),
            _ => SearchFilters::new(),
        };
        SearchHistoryEntry {
            id: self.id,
            user_id: self.user_id,
            query: self.query,
            filters,
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize)]
struct SearchHistoryInsert<'a> {
    user_id: Uuid,
    query: &'a str,
    filters: &'a SearchFilters,
}

//=========================================================================================
// `DataStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DataStore for SupabaseStore {
    async fn create_profile(&self, who: &Identity, fields: NewProfile) -> PortResult<Profile> {
        let payload = ProfileInsert {
            user_id: who.user_id,
            name: fields.name,
            dob: fields.dob,
            currently_pursuing: fields.currently_pursuing,
            interests: fields.interests.unwrap_or_default(),
            phone: fields.phone,
        };
        let builder = Self::returning_one(self.request(Method::POST, PROFILES, who)).json(&payload);
        let response = send(builder, Op::Write, "creating profile").await?;
        let record: ProfileRecord = decode(response, Op::Write, "creating profile").await?;
        Ok(record.to_domain())
    }

    async fn get_profile(&self, who: &Identity) -> PortResult<Profile> {
        let builder = self
            .request(Method::GET, PROFILES, who)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .query(&[("select", "*".to_string()), ("user_id", eq(who.user_id))]);
        let response = send(builder, Op::Read, "fetching profile").await?;
        let record: ProfileRecord = decode(response, Op::Read, "fetching profile").await?;
        Ok(record.to_domain())
    }

    async fn find_profile(&self, who: &Identity) -> PortResult<Option<Profile>> {
        let builder = self.request(Method::GET, PROFILES, who).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(who.user_id)),
            ("limit", "1".to_string()),
        ]);
        let response = send(builder, Op::Read, "fetching profile").await?;
        let records: Vec<ProfileRecord> = decode(response, Op::Read, "fetching profile").await?;
        Ok(records.into_iter().next().map(ProfileRecord::to_domain))
    }

    async fn update_profile(
        &self,
        who: &Identity,
        changes: ProfileUpdate,
    ) -> PortResult<Profile> {
        if changes.is_empty() {
            return self.get_profile(who).await.map_err(|e| match e {
                PortError::NotFound(msg) => PortError::RemoteWrite(msg),
                other => other,
            });
        }
        let builder = Self::returning_one(self.request(Method::PATCH, PROFILES, who))
            .query(&[("user_id", eq(who.user_id))])
            .json(&changes);
        let response = send(builder, Op::Write, "updating profile").await?;
        let record: ProfileRecord = decode(response, Op::Write, "updating profile").await?;
        Ok(record.to_domain())
    }

    async fn create_folder(&self, who: &Identity, draft: NewFolder) -> PortResult<Folder> {
        let payload = FolderInsert {
            user_id: who.user_id,
            name: &draft.name,
            description: &draft.description,
        };
        let builder = Self::returning_one(self.request(Method::POST, FOLDERS, who)).json(&payload);
        let response = send(builder, Op::Write, "creating folder").await?;
        let record: FolderRecord = decode(response, Op::Write, "creating folder").await?;
        Ok(record.to_domain())
    }

    async fn get_folders(&self, who: &Identity) -> PortResult<Vec<Folder>> {
        let builder = self.request(Method::GET, FOLDERS, who).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(who.user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        let response = send(builder, Op::Read, "fetching folders").await?;
        let records: Vec<FolderRecord> = decode(response, Op::Read, "fetching folders").await?;
        Ok(records.into_iter().map(FolderRecord::to_domain).collect())
    }

    async fn update_folder(
        &self,
        who: &Identity,
        folder_id: Uuid,
        changes: FolderUpdate,
    ) -> PortResult<Folder> {
        let scope = [("id", eq(folder_id)), ("user_id", eq(who.user_id))];
        let builder = if changes.is_empty() {
            // Nothing to write; return the row as stored.
            self.request(Method::GET, FOLDERS, who)
                .header(header::ACCEPT, SINGLE_OBJECT)
                .query(&scope)
        } else {
            Self::returning_one(self.request(Method::PATCH, FOLDERS, who))
                .query(&scope)
                .json(&changes)
        };
        let response = send(builder, Op::Write, "updating folder").await?;
        let record: FolderRecord = decode(response, Op::Write, "updating folder").await?;
        Ok(record.to_domain())
    }

    async fn delete_folder(&self, who: &Identity, folder_id: Uuid) -> PortResult<()> {
        let builder = self
            .request(Method::DELETE, FOLDERS, who)
            .query(&[("id", eq(folder_id)), ("user_id", eq(who.user_id))]);
        send(builder, Op::Write, "deleting folder").await?;
        Ok(())
    }

    async fn add_search_history(
        &self,
        who: &Identity,
        query: &str,
        filters: SearchFilters,
    ) -> PortResult<SearchHistoryEntry> {
        let payload = SearchHistoryInsert {
            user_id: who.user_id,
            query,
            filters: &filters,
        };
        let builder =
            Self::returning_one(self.request(Method::POST, SEARCH_HISTORY, who)).json(&payload);
        let response = send(builder, Op::Write, "adding search history").await?;
        let record: SearchHistoryRecord =
            decode(response, Op::Write, "adding search history").await?;
        Ok(record.to_domain())
    }

    async fn get_search_history(&self, who: &Identity) -> PortResult<Vec<SearchHistoryEntry>> {
        let builder = self.request(Method::GET, SEARCH_HISTORY, who).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(who.user_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        let response = send(builder, Op::Read, "fetching search history").await?;
        let records: Vec<SearchHistoryRecord> =
            decode(response, Op::Read, "fetching search history").await?;
        Ok(records
            .into_iter()
            .map(SearchHistoryRecord::to_domain)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn body(code: Option<&str>, message: Option<&str>) -> ApiErrorBody {
        ApiErrorBody {
            code: code.map(str::to_string),
            message: message.map(str::to_string),
            details: None,
        }
    }

    #[test]
    fn zero_rows_on_read_is_not_found() {
        let err = classify(
            StatusCode::NOT_ACCEPTABLE,
            &body(Some(NO_ROWS), None),
            Op::Read,
            "fetching profile",
        );
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[test]
    fn zero_rows_on_write_is_a_write_error() {
        let err = classify(
            StatusCode::NOT_ACCEPTABLE,
            &body(Some(NO_ROWS), None),
            Op::Write,
            "updating folder",
        );
        assert!(matches!(err, PortError::RemoteWrite(_)));
    }

    #[rstest]
    #[case(Op::Read)]
    #[case(Op::Write)]
    fn expired_token_is_unauthorized(#[case] op: Op) {
        let err = classify(StatusCode::UNAUTHORIZED, &body(Some("PGRST301"), None), op, "x");
        assert_eq!(err, PortError::Unauthorized);
    }

    #[test]
    fn unique_violation_keeps_server_message() {
        let err = classify(
            StatusCode::CONFLICT,
            &body(Some("23505"), Some("duplicate key value violates unique constraint")),
            Op::Write,
            "creating profile",
        );
        assert_eq!(
            err,
            PortError::RemoteWrite(
                "creating profile: duplicate key value violates unique constraint".into()
            )
        );
    }

    #[test]
    fn history_filters_flatten_to_strings() {
        let record = SearchHistoryRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            query: "q".into(),
            filters: Some(serde_json::json!({"paperYear": "2020", "limit": 5})),
            created_at: Utc::now(),
        };
        let entry = record.to_domain();
        assert_eq!(entry.filters.get("paperYear").map(String::as_str), Some("2020"));
        assert_eq!(entry.filters.get("limit").map(String::as_str), Some("5"));
    }
}
