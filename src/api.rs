// api.rs
//! Typed request/response envelope around the poll operations.
//!
//! A request carries the method, an optional JSON body and the query
//! parameters. A response carries a status, headers and one of the result
//! bodies below. Nothing here touches storage.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::PollError;
use crate::models::{NewPoll, NewVote, OptionRow, PollRow, RecordId};

#[derive(Debug, Clone)]
pub struct PollRequest {
    pub method: Method,
    pub body: Option<String>,
    pub query: HashMap<String, String>,
}

impl PollRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            query: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// A request without a body reads as an empty JSON object.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("{}")
    }
}

/// What a POST body asks for, keyed by its `action` field.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create(CreatePollBody),
    Vote(VoteBody),
    Unknown(Option<String>),
}

impl Action {
    pub fn parse(body: &str) -> Result<Self, PollError> {
        let mut fields: serde_json::Map<String, Value> =
            serde_json::from_str(body).map_err(PollError::MalformedBody)?;

        let action = match fields.remove("action") {
            Some(Value::String(action)) => Some(action),
            _ => None,
        };
        let rest = Value::Object(fields);

        match action.as_deref() {
            Some("create") => serde_json::from_value(rest)
                .map(Action::Create)
                .map_err(PollError::MalformedBody),
            Some("vote") => serde_json::from_value(rest)
                .map(Action::Vote)
                .map_err(PollError::MalformedBody),
            _ => Ok(Action::Unknown(action)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub options: Option<Vec<String>>,
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "loose_id")]
    pub user_id: Option<RecordId>,
}

impl CreatePollBody {
    /// `endDate` is kept as text; the store decides whether it is a timestamp.
    pub fn into_new_poll(self) -> NewPoll {
        NewPoll {
            title: self.title,
            description: self.description,
            options: self.options.unwrap_or_default(),
            end_date: self.end_date.map(|raw| raw.trim().to_string()),
            creator_id: self.user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    #[serde(default, deserialize_with = "loose_id")]
    pub poll_id: Option<RecordId>,
    #[serde(default, deserialize_with = "loose_id")]
    pub option_id: Option<RecordId>,
    #[serde(default, deserialize_with = "loose_id")]
    pub user_id: Option<RecordId>,
}

impl From<VoteBody> for NewVote {
    fn from(body: VoteBody) -> Self {
        Self {
            poll_id: body.poll_id,
            option_id: body.option_id,
            user_id: body.user_id,
        }
    }
}

/// Ids arrive as JSON numbers or as numeric strings; browsers hand back the
/// string ids the listing produced.
fn loose_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(RecordId),
        Text(String),
    }

    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Loose::Number(id)) => Ok(Some(id)),
        Some(Loose::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("'{text}' is not a valid id"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub votes: i32,
}

impl From<OptionRow> for OptionView {
    fn from(row: OptionRow) -> Self {
        Self {
            id: row.id.to_string(),
            text: row.text,
            votes: row.votes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<OptionView>,
    pub total_votes: i64,
    pub is_active: bool,
    pub end_date: Option<NaiveDateTime>,
    pub creator_name: Option<String>,
}

impl PollView {
    pub fn new(row: PollRow, options: Vec<OptionRow>) -> Self {
        Self {
            id: row.id.to_string(),
            title: row.title,
            description: row.description,
            options: options.into_iter().map(OptionView::from).collect(),
            total_votes: row.total_votes,
            is_active: row.is_active,
            end_date: row.end_date,
            creator_name: row.creator_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult {
    pub polls: Vec<PollView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResult {
    pub success: bool,
    pub poll_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteResult {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Empty,
    List(ListResult),
    Created(CreateResult),
    Voted(VoteResult),
    Error(ErrorResult),
}

#[derive(Debug, Clone)]
pub struct PollResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl PollResponse {
    pub fn preflight() -> Self {
        let mut headers = cors_headers();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, X-User-Id"),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static("86400"),
        );

        Self {
            status: StatusCode::OK,
            headers,
            body: ResponseBody::Empty,
        }
    }

    pub fn json(status: StatusCode, body: ResponseBody) -> Self {
        let mut headers = cors_headers();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Self {
            status,
            headers,
            body,
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            headers: cors_headers(),
            body: ResponseBody::Error(ErrorResult::new("Method not allowed")),
        }
    }

    /// The body as sent on the wire; `Empty` is the empty string.
    pub fn body_text(&self) -> Result<String, PollError> {
        match &self.body {
            ResponseBody::Empty => Ok(String::new()),
            body => serde_json::to_string(body).map_err(PollError::Serialize),
        }
    }
}

pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn vote_body_accepts_numeric_strings_and_numbers() {
        let action = Action::parse(r#"{"action":"vote","pollId":"7","optionId":12,"userId":1}"#)
            .unwrap();

        assert_eq!(
            action,
            Action::Vote(VoteBody {
                poll_id: Some(7),
                option_id: Some(12),
                user_id: Some(1),
            })
        );
    }

    #[test]
    fn non_numeric_id_is_a_malformed_body() {
        let err = Action::parse(r#"{"action":"vote","pollId":"seven"}"#).unwrap_err();
        assert!(matches!(err, PollError::MalformedBody(_)));
    }

    #[test]
    fn missing_fields_stay_absent() {
        let action = Action::parse(r#"{"action":"vote"}"#).unwrap();
        assert_eq!(action, Action::Vote(VoteBody::default()));

        let action = Action::parse(r#"{"action":"create"}"#).unwrap();
        let Action::Create(body) = action else {
            panic!("expected create");
        };
        let poll = body.into_new_poll();
        assert!(poll.title.is_none());
        assert!(poll.options.is_empty());
    }

    #[test]
    fn unknown_or_missing_action_is_not_an_error() {
        assert_eq!(
            Action::parse(r#"{"action":"delete"}"#).unwrap(),
            Action::Unknown(Some("delete".to_string()))
        );
        assert_eq!(Action::parse("{}").unwrap(), Action::Unknown(None));
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(matches!(
            Action::parse("[1, 2]"),
            Err(PollError::MalformedBody(_))
        ));
        assert!(matches!(
            Action::parse("not json"),
            Err(PollError::MalformedBody(_))
        ));
    }

    #[test]
    fn end_date_is_passed_on_trimmed_and_unchecked() {
        let body = CreatePollBody {
            end_date: Some("  2025-01-31 10:00 ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            body.into_new_poll().end_date.as_deref(),
            Some("2025-01-31 10:00")
        );

        let body = CreatePollBody {
            end_date: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(body.into_new_poll().end_date.as_deref(), Some(""));
    }

    #[test]
    fn poll_view_renders_string_ids_and_iso_end_date() {
        let end = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let row = PollRow {
            id: 3,
            title: "Lunch".to_string(),
            description: None,
            is_active: true,
            end_date: Some(end),
            created_at: end,
            creator_id: None,
            creator_name: None,
            total_votes: 2,
        };
        let options = vec![OptionRow {
            id: 10,
            text: "Soup".to_string(),
            votes: 2,
        }];

        let body = ResponseBody::List(ListResult {
            polls: vec![PollView::new(row, options)],
        });

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "polls": [{
                    "id": "3",
                    "title": "Lunch",
                    "description": null,
                    "options": [{"id": "10", "text": "Soup", "votes": 2}],
                    "totalVotes": 2,
                    "isActive": true,
                    "endDate": "2025-01-31T00:00:00",
                    "creatorName": null
                }]
            })
        );
    }

    #[test]
    fn result_bodies_match_wire_shapes() {
        let created = PollResponse::json(
            StatusCode::CREATED,
            ResponseBody::Created(CreateResult {
                success: true,
                poll_id: 4,
            }),
        );
        assert_eq!(
            created.body_text().unwrap(),
            r#"{"success":true,"pollId":4}"#
        );
        assert_eq!(created.headers[header::CONTENT_TYPE], "application/json");

        let rejected = PollResponse::method_not_allowed();
        assert_eq!(
            rejected.body_text().unwrap(),
            r#"{"error":"Method not allowed"}"#
        );
        assert!(rejected.headers.get(header::CONTENT_TYPE).is_none());
        assert_eq!(rejected.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn preflight_has_empty_body_and_cors_headers() {
        let response = PollResponse::preflight();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body_text().unwrap(), "");
        assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
        assert_eq!(response.headers[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
