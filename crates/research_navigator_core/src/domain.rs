//! crates/research_navigator_core/src/domain.rs
//!
//! Defines the core data structures for the application: the three user-scoped
//! rows of the hosted store, the identity every store call is scoped by, and the
//! paper-search query/result shapes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// Identity
//=========================================================================================

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Tokens issued by the identity provider for one sign-in.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthenticatedUser,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Longest access-token lifetime the identity provider can be configured with.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

impl AuthSession {
    /// The expiry instant for a token issued at `now` that lives `expires_in`
    /// seconds. `None` unless `expires_in` is in `1..=MAX_TOKEN_LIFETIME_SECS`.
    pub fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&expires_in) {
            return None;
        }
        chrono::Duration::try_seconds(expires_in).and_then(|ttl| now.checked_add_signed(ttl))
    }

    /// True once the access token is within `leeway_secs` of expiring.
    /// An expiry that cannot be offset by the leeway counts as expiring.
    pub fn is_expiring(&self, now: DateTime<Utc>, leeway_secs: i64) -> bool {
        chrono::Duration::try_seconds(leeway_secs)
            .and_then(|leeway| self.expires_at.checked_sub_signed(leeway))
            .map_or(true, |refresh_at| refresh_at <= now)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user.user_id,
            access_token: self.access_token.clone(),
        }
    }
}

/// The resolved identity a store call is made on behalf of.
///
/// Only a resolved session hands these out, so a request can never be issued
/// with an empty user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub access_token: String,
}

//=========================================================================================
// Profiles
//=========================================================================================

/// The user's editable personal and research metadata. One per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub currently_pursuing: String,
    pub interests: Vec<String>,
    pub phone: String,
}

/// Fields submitted when a profile row is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub currently_pursuing: String,
    /// Omitted interests are stored as an empty list.
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub phone: String,
}

/// A partial profile update. `None` leaves the stored column unchanged;
/// `dob: Some(None)` clears the date of birth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub dob: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currently_pursuing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.dob.is_none()
            && self.currently_pursuing.is_none()
            && self.interests.is_none()
            && self.phone.is_none()
    }

    /// Merges the given fields into `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = name.clone();
        }
        if let Some(dob) = self.dob {
            profile.dob = dob;
        }
        if let Some(pursuing) = &self.currently_pursuing {
            profile.currently_pursuing = pursuing.clone();
        }
        if let Some(interests) = &self.interests {
            profile.interests = interests.clone();
        }
        if let Some(phone) = &self.phone {
            profile.phone = phone.clone();
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

//=========================================================================================
// Folders ("tagged pages")
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewFolder {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FolderUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub fn apply_to(&self, folder: &mut Folder) {
        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(description) = &self.description {
            folder.description = description.clone();
        }
    }
}

//=========================================================================================
// Search history
//=========================================================================================

/// The filter mapping stored alongside a past query.
pub type SearchFilters = BTreeMap<String, String>;

/// An immutable record of a past query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub filters: SearchFilters,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Paper search
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationType {
    #[default]
    Journal,
    Conference,
}

impl PublicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationType::Journal => "journal",
            PublicationType::Conference => "conference",
        }
    }
}

/// The advanced-search form. Field names serialize to the search API's
/// parameter names unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedSearchParams {
    pub paper_id: String,
    pub paper_name: String,
    pub paper_author: String,
    pub paper_topic: String,
    pub paper_year: String,
    pub publication_type: PublicationType,
    pub field: String,
    pub keywords: Vec<String>,
}

impl AdvancedSearchParams {
    /// True when no text field is filled in and no keyword is given.
    /// The publication type always has a value and does not count.
    pub fn is_blank(&self) -> bool {
        [
            &self.paper_id,
            &self.paper_name,
            &self.paper_author,
            &self.paper_topic,
            &self.paper_year,
            &self.field,
        ]
        .iter()
        .all(|value| value.trim().is_empty())
            && self.keywords.iter().all(|k| k.trim().is_empty())
    }

    /// Parses the comma-separated keyword input of the form.
    pub fn parse_keywords(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The non-empty fields as `(api parameter, value)` pairs, in form order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params: Vec<(&'static str, String)> = [
            ("paperId", &self.paper_id),
            ("paperName", &self.paper_name),
            ("paperAuthor", &self.paper_author),
            ("paperTopic", &self.paper_topic),
            ("paperYear", &self.paper_year),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(key, value)| (key, value.trim().to_string()))
        .collect();

        params.push(("publicationType", self.publication_type.as_str().to_string()));
        if !self.field.trim().is_empty() {
            params.push(("field", self.field.trim().to_string()));
        }
        for keyword in self.keywords.iter().filter(|k| !k.trim().is_empty()) {
            params.push(("keywords[]", keyword.trim().to_string()));
        }
        params
    }

    /// The filter mapping recorded in search history.
    pub fn to_filters(&self) -> SearchFilters {
        let mut filters = SearchFilters::new();
        for (key, value) in self.to_params() {
            if key == "keywords[]" {
                continue;
            }
            filters.insert(key.to_string(), value);
        }
        let keywords: Vec<&str> = self
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if !keywords.is_empty() {
            filters.insert("keywords".to_string(), keywords.join(", "));
        }
        filters
    }
}

/// One request to the paper-search API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperQuery {
    pub query: String,
    /// Present only while advanced mode is open.
    pub advanced: Option<AdvancedSearchParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaperAuthor {
    #[serde(rename = "authorId", default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A search result, passed through as the API returned it. The API sends
/// `null` for fields it has no data for; those read as empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Paper {
    #[serde(rename = "paperId", default)]
    pub paper_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<PaperAuthor>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
}

//=========================================================================================
// Notices
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn blank_advanced_form_ignores_publication_type() {
        let params = AdvancedSearchParams {
            publication_type: PublicationType::Conference,
            keywords: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(params.is_blank());
    }

    #[rstest]
    #[case::id(AdvancedSearchParams { paper_id: "abc".into(), ..Default::default() })]
    #[case::year(AdvancedSearchParams { paper_year: "2020".into(), ..Default::default() })]
    #[case::field(AdvancedSearchParams { field: "physics".into(), ..Default::default() })]
    #[case::keyword(AdvancedSearchParams { keywords: vec!["rust".into()], ..Default::default() })]
    fn any_filled_field_makes_form_non_blank(#[case] params: AdvancedSearchParams) {
        assert!(!params.is_blank());
    }

    #[test]
    fn keywords_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            AdvancedSearchParams::parse_keywords(" graphs, ,  neural nets ,"),
            vec!["graphs".to_string(), "neural nets".to_string()]
        );
    }

    #[test]
    fn params_keep_api_field_names() {
        let params = AdvancedSearchParams {
            paper_author: "Hinton".into(),
            keywords: vec!["vision".into(), "cnn".into()],
            ..Default::default()
        };
        assert_eq!(
            params.to_params(),
            vec![
                ("paperAuthor", "Hinton".to_string()),
                ("publicationType", "journal".to_string()),
                ("keywords[]", "vision".to_string()),
                ("keywords[]", "cnn".to_string()),
            ]
        );
        let filters = params.to_filters();
        assert_eq!(filters.get("keywords").map(String::as_str), Some("vision, cnn"));
        assert_eq!(filters.get("paperAuthor").map(String::as_str), Some("Hinton"));
    }

    #[test]
    fn profile_update_distinguishes_null_from_absent() {
        let cleared: ProfileUpdate = serde_json::from_str(r#"{"dob": null}"#).unwrap();
        assert_eq!(cleared.dob, Some(None));

        let untouched: ProfileUpdate = serde_json::from_str(r#"{"name": "Ada"}"#).unwrap();
        assert_eq!(untouched.dob, None);
        assert_eq!(
            serde_json::to_value(&untouched).unwrap(),
            serde_json::json!({"name": "Ada"})
        );
    }

    #[test]
    fn paper_deserializes_api_shape() {
        let paper: Paper = serde_json::from_value(serde_json::json!({
            "paperId": "p1",
            "title": "Attention Is All You Need",
            "authors": [{"authorId": "1", "name": "A. Vaswani"}, {"authorId": null, "name": "N. Shazeer"}],
            "year": 2017,
            "url": "https://example.org/p1",
            "abstract": null
        }))
        .unwrap();
        assert_eq!(paper.authors.len(), 2);
        assert_eq!(paper.authors[1].name, "N. Shazeer");
        assert_eq!(paper.year, Some(2017));
        assert!(paper.abstract_text.is_none());
    }

    #[test]
    fn paper_with_null_fields_still_deserializes() {
        let paper: Paper = serde_json::from_value(serde_json::json!({
            "paperId": "p2",
            "title": null,
            "authors": [{"authorId": "7", "name": null}, {"authorId": "8"}],
            "year": null
        }))
        .unwrap();
        assert_eq!(paper.title, "");
        assert_eq!(paper.authors[0].name, "");
        assert_eq!(paper.authors[1].name, "");

        let no_authors: Paper =
            serde_json::from_value(serde_json::json!({"paperId": "p3", "authors": null})).unwrap();
        assert!(no_authors.authors.is_empty());
    }

    fn session_expiring_at(expires_at: DateTime<Utc>) -> AuthSession {
        AuthSession {
            user: AuthenticatedUser {
                user_id: Uuid::new_v4(),
                email: None,
            },
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at,
        }
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-5)]
    #[case::past_the_cap(MAX_TOKEN_LIFETIME_SECS + 1)]
    #[case::max(i64::MAX)]
    #[case::min(i64::MIN)]
    fn out_of_range_token_lifetimes_are_rejected(#[case] expires_in: i64) {
        assert_eq!(AuthSession::expiry_after(Utc::now(), expires_in), None);
    }

    #[test]
    fn token_lifetime_is_added_to_issue_time() {
        let now = Utc::now();
        assert_eq!(
            AuthSession::expiry_after(now, 3600),
            Some(now + chrono::Duration::hours(1))
        );
    }

    #[test]
    fn expiry_check_respects_leeway_and_extremes() {
        let now = Utc::now();
        let fresh = session_expiring_at(now + chrono::Duration::hours(1));
        assert!(!fresh.is_expiring(now, 60));
        assert!(fresh.is_expiring(now, 3600));

        let earliest = session_expiring_at(DateTime::<Utc>::MIN_UTC);
        assert!(earliest.is_expiring(now, 60));

        let latest = session_expiring_at(DateTime::<Utc>::MAX_UTC);
        assert!(!latest.is_expiring(now, 60));
        assert!(latest.is_expiring(now, i64::MAX));
    }
}
