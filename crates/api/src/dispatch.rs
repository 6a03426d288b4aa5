//! Request dispatch: path → operation, parameter validation, store calls.
//!
//! Both GET and POST land here. Parameters arrive as URL query pairs, merged
//! with POST form-urlencoded body pairs (body wins on key collision); each
//! operation parses its own typed parameter struct out of the merged bag.
//! Results and failures alike leave as the tagged envelope, JSONP-wrapped
//! when a callback name rides along.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, Method, Uri};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

use routebook_core::route::{RecordType, Route, RouteData, ServerRoute};
use routebook_core::{time, validate, CoreError};

use crate::error::{AppError, AppResult};
use crate::response::Envelope;
use crate::state::AppState;

/// Wire name of the JSONP callback parameter.
const JSONP_CALLBACK: &str = "jsonp-callback";

/// The closed set of operations this endpoint serves.
///
/// The dispatcher matches this enum exhaustively, so adding or removing an
/// operation is a type-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetRoutes,
    SetRoute,
    DeleteRoute,
    ClearRoutes,
}

impl Operation {
    /// Map a request path segment to an operation.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "get-routes" => Some(Operation::GetRoutes),
            "set-route" => Some(Operation::SetRoute),
            "delete-route" => Some(Operation::DeleteRoute),
            "clear-routes" => Some(Operation::ClearRoutes),
            _ => None,
        }
    }
}

/// Merged request parameters.
type ParamMap = BTreeMap<String, String>;

/// Parameters for `get-routes`.
#[derive(Debug, Deserialize)]
struct GetRoutesParams {
    #[serde(rename = "user-id")]
    user_id: String,
    since: Option<String>,
}

/// Parameters for `set-route`. `data` is a JSON-encoded object string,
/// defaulting to `{}` when absent.
#[derive(Debug, Deserialize)]
struct SetRouteParams {
    #[serde(rename = "type")]
    kind: RecordType,
    #[serde(rename = "user-id")]
    user_id: String,
    #[serde(rename = "route-id")]
    route_id: String,
    #[serde(rename = "route-name")]
    route_name: String,
    description: String,
    note: String,
    coordinates: String,
    data: Option<String>,
}

/// Parameters for `delete-route`.
#[derive(Debug, Deserialize)]
struct DeleteRouteParams {
    #[serde(rename = "route-id")]
    route_id: String,
}

/// Parameters for `clear-routes`.
#[derive(Debug, Deserialize)]
struct ClearRoutesParams {
    #[serde(rename = "user-id")]
    user_id: String,
}

/// `{ "routes": [...] }` result of `get-routes`.
#[derive(Debug, Serialize)]
struct RoutesValue {
    routes: Vec<ServerRoute>,
}

/// `{ "updatedAt": ... }` result of the mutating operations.
#[derive(Debug, Serialize)]
struct UpdatedAtValue {
    #[serde(rename = "updatedAt", with = "routebook_core::time::iso8601_millis")]
    updated_at: DateTime<Utc>,
}

/// GET/POST handler for `/{operation}`.
pub async fn dispatch(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = merge_params(method == Method::POST, query.as_deref(), &headers, &body);
    let callback = params.get(JSONP_CALLBACK).cloned();
    tracing::debug!(%method, %path, params = params.len(), "dispatching request");

    // Serialize requests through the advisory lock; proceed unlocked when
    // the deadline elapses.
    let _guard = state.lock.acquire(state.config.lock_wait).await;

    let envelope = match run(&state, &path, &params) {
        Ok(value) => Envelope::success(value),
        Err(err) => err.into_envelope(),
    };
    envelope.into_response_with(callback.as_deref())
}

/// Fallback for any path that is not exactly one operation segment. Produces
/// the same envelope an unrecognized operation would, so path mistakes stay
/// visible to JSONP callers.
pub async fn invalid_path(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/').to_string();
    let callback = uri
        .query()
        .map(|q| first_wins_pairs(q.as_bytes()))
        .and_then(|params| params.get(JSONP_CALLBACK).cloned());
    AppError::InvalidPath(path)
        .into_envelope()
        .into_response_with(callback.as_deref())
}

fn run(state: &AppState, path: &str, params: &ParamMap) -> AppResult<Value> {
    let Some(operation) = Operation::from_path(path) else {
        return Err(AppError::InvalidPath(path.to_string()));
    };

    match operation {
        Operation::GetRoutes => {
            let p: GetRoutesParams = parse_params(params)?;
            validate::validate_user_id(&p.user_id)?;
            let since = p.since.as_deref().map(parse_since).transpose()?;
            let routes = state.store.get_routes(&p.user_id, since)?;
            to_value(&RoutesValue { routes })
        }
        Operation::SetRoute => {
            let p: SetRouteParams = parse_params(params)?;
            validate::validate_user_id(&p.user_id)?;
            validate::validate_route_id(&p.route_id)?;
            let data = parse_data(p.data.as_deref())?;
            let route = Route {
                kind: p.kind,
                user_id: p.user_id,
                route_id: p.route_id,
                route_name: p.route_name,
                description: p.description,
                note: p.note,
                data,
                coordinates: p.coordinates,
            };
            let updated_at = state.store.set_route(&route)?;
            to_value(&UpdatedAtValue { updated_at })
        }
        Operation::DeleteRoute => {
            let p: DeleteRouteParams = parse_params(params)?;
            validate::validate_route_id(&p.route_id)?;
            let updated_at = state.store.delete_route(&p.route_id)?;
            to_value(&UpdatedAtValue { updated_at })
        }
        Operation::ClearRoutes => {
            let p: ClearRoutesParams = parse_params(params)?;
            validate::validate_user_id(&p.user_id)?;
            let updated_at = state.store.clear_routes(&p.user_id)?;
            to_value(&UpdatedAtValue { updated_at })
        }
    }
}

/// Deserialize an operation's parameter struct from the merged map.
///
/// Unknown keys are ignored, so the JSONP callback parameter can ride
/// alongside any operation's own parameters.
fn parse_params<T: serde::de::DeserializeOwned>(params: &ParamMap) -> AppResult<T> {
    let object: JsonMap<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    serde_json::from_value(Value::Object(object))
        .map_err(|err| CoreError::Validation(format!("invalid parameters: {err}")).into())
}

fn parse_since(raw: &str) -> AppResult<DateTime<Utc>> {
    time::parse_iso8601(raw).map_err(|err| {
        CoreError::Validation(format!("since is not a valid ISO-8601 timestamp: {err}")).into()
    })
}

/// Parse the `data` parameter (a JSON-encoded string) into the open map.
/// Absent means empty.
fn parse_data(raw: Option<&str>) -> AppResult<RouteData> {
    let Some(raw) = raw else {
        return Ok(RouteData::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CoreError::Validation("data must be a JSON object".to_string()).into()),
        Err(err) => Err(CoreError::Validation(format!("data is not valid JSON: {err}")).into()),
    }
}

fn to_value<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| CoreError::Internal(format!("result serialization failed: {err}")).into())
}

/// Collect request parameters: URL query pairs, then POST form-urlencoded
/// body pairs on top (body wins on collision). Within one source the first
/// occurrence of a key wins.
fn merge_params(is_post: bool, query: Option<&str>, headers: &HeaderMap, body: &Bytes) -> ParamMap {
    let mut params = query
        .map(|q| first_wins_pairs(q.as_bytes()))
        .unwrap_or_default();
    if is_post && is_form_content_type(headers) {
        for (key, value) in first_wins_pairs(body) {
            params.insert(key, value);
        }
    }
    params
}

fn first_wins_pairs(raw: &[u8]) -> ParamMap {
    let mut out = ParamMap::new();
    for (key, value) in url::form_urlencoded::parse(raw) {
        out.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    out
}

fn is_form_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|m| m.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_paths_are_closed() {
        assert_eq!(Operation::from_path("get-routes"), Some(Operation::GetRoutes));
        assert_eq!(Operation::from_path("set-route"), Some(Operation::SetRoute));
        assert_eq!(
            Operation::from_path("delete-route"),
            Some(Operation::DeleteRoute)
        );
        assert_eq!(
            Operation::from_path("clear-routes"),
            Some(Operation::ClearRoutes)
        );
        assert_eq!(Operation::from_path("sync-routes"), None);
        assert_eq!(Operation::from_path(""), None);
    }

    #[test]
    fn query_pairs_first_occurrence_wins() {
        let params = first_wins_pairs(b"user-id=u1&user-id=u2&since=s");
        assert_eq!(params["user-id"], "u1");
        assert_eq!(params["since"], "s");
    }

    #[test]
    fn body_pairs_override_query_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=utf-8".parse().unwrap(),
        );
        let body = Bytes::from_static(b"route-name=from-body");
        let params = merge_params(
            true,
            Some("route-name=from-query&user-id=u1"),
            &headers,
            &body,
        );
        assert_eq!(params["route-name"], "from-body");
        assert_eq!(params["user-id"], "u1");
    }

    #[test]
    fn non_form_post_bodies_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let body = Bytes::from_static(b"user-id=from-body");
        let params = merge_params(true, Some("user-id=u1"), &headers, &body);
        assert_eq!(params["user-id"], "u1");
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let params = first_wins_pairs(b"route-name=a%20b%26c&coordinates=1%2C1");
        assert_eq!(params["route-name"], "a b&c");
        assert_eq!(params["coordinates"], "1,1");
    }

    #[test]
    fn set_route_params_require_the_route_literal() {
        let mut params = ParamMap::new();
        for (k, v) in [
            ("type", "waypoint"),
            ("user-id", "u1"),
            ("route-id", "r1"),
            ("route-name", "n"),
            ("description", ""),
            ("note", ""),
            ("coordinates", ""),
        ] {
            params.insert(k.to_string(), v.to_string());
        }
        assert!(parse_params::<SetRouteParams>(&params).is_err());

        params.insert("type".to_string(), "route".to_string());
        assert!(parse_params::<SetRouteParams>(&params).is_ok());
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let mut params = ParamMap::new();
        params.insert("user-id".to_string(), "u1".to_string());
        params.insert(JSONP_CALLBACK.to_string(), "cb".to_string());
        let parsed: GetRoutesParams = parse_params(&params).unwrap();
        assert_eq!(parsed.user_id, "u1");
        assert!(parsed.since.is_none());
    }

    #[test]
    fn data_defaults_to_an_empty_object() {
        assert!(parse_data(None).unwrap().is_empty());
        assert_eq!(
            parse_data(Some(r#"{"color":"red"}"#)).unwrap()["color"],
            "red"
        );
        assert!(parse_data(Some("[1,2]")).is_err());
        assert!(parse_data(Some("{nope")).is_err());
    }
}
