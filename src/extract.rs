use axum::{
    async_trait,
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{ApiError, FieldError};

lazy_static! {
    static ref MISSING_FIELD_RE: Regex = Regex::new(r"missing field `([^`]+)`").unwrap();
    static ref FIELD_PATH_RE: Regex =
        Regex::new(r"^([A-Za-z_][\w.\[\]]*): (.+?)(?: at line \d+ column \d+)?$").unwrap();
    static ref POSITION_RE: Regex = Regex::new(r" at line \d+ column \d+$").unwrap();
}

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turn a serde data error into the field it is about.
fn field_error(text: &str) -> FieldError {
    let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(text);

    if let Some(caps) = MISSING_FIELD_RE.captures(detail) {
        let field = match FIELD_PATH_RE.captures(detail) {
            Some(path) => format!("{}.{}", &path[1], &caps[1]),
            None => caps[1].to_string(),
        };
        return FieldError {
            field: field.into(),
            message: "Required".into(),
        };
    }
    if let Some(caps) = FIELD_PATH_RE.captures(detail) {
        return FieldError {
            field: caps[1].to_string().into(),
            message: capitalize(&caps[2]),
        };
    }
    FieldError {
        field: "body".into(),
        message: capitalize(&POSITION_RE.replace(detail, "")),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "json body rejected");
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation(vec![field_error(&e.body_text())]),
            JsonRejection::JsonSyntaxError(_) => ApiError::BadRequest("Malformed JSON body".into()),
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::BadRequest("Expected request with `Content-Type: application/json`".into())
            }
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!(error = %rejection.body_text(), "path rejected");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection.body_text(), "query rejected");
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` whose rejections render as `ApiError`.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// A JSON body that may be left out entirely. A body that is present must parse.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJson(Some(value)))
    }
}

pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
