//! # REST API
//!
//! One generic resource per record type, mounted under `/api/<collection>/`.  Handlers are
//! generic over [`Record`]; everything they need to know about a record type comes from its
//! [`RecordKind`], so the seven resources share a single implementation.
//!
//! Rows travel through the API as JSON objects.  On the way out, link fields become absolute
//! hyperlinks and the row gains a `url`.  On the way in, hyperlinks (absolute or path) and
//! bare UUIDs are both accepted for link fields and reduced back to ids before the record is
//! deserialized and validated.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Extension, Json, Router, async_trait, middleware};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;
use uuid::Uuid;

use crate::account::Identity;
use crate::auth::require_permission;
use crate::config::GardenConfig;
use crate::errors::{ApiError, StoreError};
use crate::object_store::object_key;
use crate::permission::has_permission;
use crate::record::{Link, Record, RecordKind};
use crate::state::AppState;
use crate::validate::FieldErrors;
use crate::{CollectPlace, Comment, Coord, Flora, Herbarium, Label, Taxon};

/// Field holding an object store reference.
pub const PICTURE_FIELD: &str = "picture";

const NON_FIELD_ERRORS: &str = "non_field_errors";
const NO_URL_MATCH: &str = "Invalid hyperlink - No URL match.";
const INCORRECT_URL_MATCH: &str = "Invalid hyperlink - Incorrect URL match.";
const OBJECT_DOES_NOT_EXIST: &str = "Invalid hyperlink - Object does not exist.";

/////////////////////////////////////////////// BaseUrl ////////////////////////////////////////////////

/// Scheme and authority that absolute hyperlinks are built on, without a trailing slash.
///
/// Taken from the configured public URL, else from the request's `Host` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(pub String);

impl BaseUrl {
    /// URL of a collection.
    pub fn collection_url(&self, kind: RecordKind) -> String {
        format!("{}/api/{}/", self.0, kind.collection())
    }

    /// URL of one record.
    pub fn item_url(&self, kind: RecordKind, id: Uuid) -> String {
        format!("{}/api/{}/{}/", self.0, kind.collection(), id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(public_url) = &state.config.public_url {
            return Ok(BaseUrl(public_url.clone()));
        }
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|host| host.to_str().ok())
            .filter(|host| !host.is_empty() && !host.contains(['/', ' ', '@']))
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|authority| authority.to_string()));
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|proto| proto.to_str().ok())
            .filter(|proto| *proto == "https" || *proto == "http")
            .or_else(|| parts.uri.scheme_str())
            .unwrap_or("http");
        Ok(match host {
            Some(host) => BaseUrl(format!("{}://{}", scheme, host)),
            None => BaseUrl("http://localhost".to_string()),
        })
    }
}

//////////////////////////////////////////// representation ////////////////////////////////////////////

/// Renders a stored row for API output.
pub fn represent(kind: RecordKind, row: &Value, base: &BaseUrl, config: &GardenConfig) -> Value {
    let mut object = row.as_object().cloned().unwrap_or_default();
    let id = object
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok());
    if let Some(id) = id {
        object.insert("url".to_string(), Value::String(base.item_url(kind, id)));
    }
    for link in kind.links() {
        let hyperlink = match object.get(link.field) {
            Some(Value::String(target)) => Uuid::parse_str(target)
                .ok()
                .map(|target| base.item_url(link.target, target)),
            _ => None,
        };
        if let Some(hyperlink) = hyperlink {
            object.insert(link.field.to_string(), Value::String(hyperlink));
        }
    }
    let picture = match object.get(PICTURE_FIELD) {
        Some(Value::String(key)) if !key.is_empty() => Some(config.object_url(&base.0, key)),
        _ => None,
    };
    if let Some(picture) = picture {
        object.insert(PICTURE_FIELD.to_string(), Value::String(picture));
    }
    Value::Object(object)
}

/// Reduces a hyperlink or bare UUID to the id of a `target` record.
///
/// Hyperlinks may be absolute (`http://host/api/taxons/<id>/`) or paths
/// (`/api/taxons/<id>/`).
pub fn parse_link(target: RecordKind, raw: &str) -> Result<Uuid, &'static str> {
    let raw = raw.trim();
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }
    let url = if raw.starts_with('/') {
        Url::parse("http://localhost").and_then(|base| base.join(raw))
    } else {
        Url::parse(raw)
    };
    let Ok(url) = url else {
        return Err(NO_URL_MATCH);
    };
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        ["api", collection, id] => match RecordKind::from_collection(collection) {
            Some(kind) if kind == target => Uuid::parse_str(id).map_err(|_| OBJECT_DOES_NOT_EXIST),
            Some(_) => Err(INCORRECT_URL_MATCH),
            None => Err(NO_URL_MATCH),
        },
        _ => Err(NO_URL_MATCH),
    }
}

fn resolve_link(link: &Link, raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => parse_link(link.target, s)
            .map(|id| Value::String(id.to_string()))
            .map_err(str::to_string),
        other => Err(format!(
            "Incorrect type. Expected URL string, received {}.",
            json_type(other)
        )),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

////////////////////////////////////////////////// input /////////////////////////////////////////////////

/// How a write combines the request body with the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// A new record with a fresh id.
    Create,
    /// Full update: every required field must be sent; omitted fields keep their values.
    Replace,
    /// Merge onto the stored row.
    Partial,
}

/// Parses a JSON request body.  An empty body is an empty object.
pub fn json_body(headers: &HeaderMap, body: &Bytes) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if mime != "application/json" && !mime.ends_with("+json") {
        return Err(ApiError::UnsupportedMediaType(content_type.to_string()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedPayload(format!("JSON parse error - {}", e)))
}

/// Turns client input into a validated record and its storage row.
///
/// `existing` is the stored row for [`WriteMode::Replace`] and [`WriteMode::Partial`].
pub fn prepare<R: Record>(
    mode: WriteMode,
    input: Value,
    existing: Option<&Value>,
) -> Result<(R, Value), ApiError> {
    let kind = R::KIND;
    let mut input = match input {
        Value::Object(input) => input,
        other => {
            let mut errors = FieldErrors::new();
            errors.add(
                NON_FIELD_ERRORS,
                format!("Invalid data. Expected a dictionary, but got {}.", json_type(&other)),
            );
            return Err(ApiError::Validation(errors));
        }
    };
    for (alias, field) in kind.aliases() {
        if let Some(value) = input.remove(*alias) {
            input.entry(field.to_string()).or_insert(value);
        }
    }
    for field in kind.read_only() {
        input.remove(*field);
    }

    let mut errors = FieldErrors::new();
    for link in kind.links() {
        if let Some(raw) = input.get_mut(link.field) {
            match resolve_link(link, raw) {
                Ok(id) => *raw = id,
                Err(message) => errors.add(link.field, message),
            }
        }
    }
    for column in kind.columns() {
        if kind.read_only().contains(&column.name) {
            continue;
        }
        match input.get(column.name) {
            None if column.required && mode != WriteMode::Partial => {
                errors.add(column.name, "This field is required.")
            }
            Some(Value::Null) if !column.nullable => {
                errors.add(column.name, "This field may not be null.")
            }
            _ => {}
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let existing = existing.and_then(Value::as_object);
    let mut row = match (mode, existing) {
        (WriteMode::Partial | WriteMode::Replace, Some(existing)) => existing.clone(),
        _ => Map::new(),
    };
    row.extend(input);
    if mode == WriteMode::Create {
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }

    let record: R = serde_json::from_value(Value::Object(row)).map_err(|e| {
        let mut errors = FieldErrors::new();
        errors.add(NON_FIELD_ERRORS, e.to_string());
        ApiError::Validation(errors)
    })?;
    record.validate().map_err(ApiError::Validation)?;
    let row = serde_json::to_value(&record).map_err(StoreError::from)?;
    Ok((record, row))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

/////////////////////////////////////////////// metadata ///////////////////////////////////////////////

/// OPTIONS body of a resource.
///
/// `write_method` names the write action to describe, when the caller may use it.
pub fn metadata(kind: RecordKind, suffix: &str, write_method: Option<&Method>) -> Value {
    let mut body = json!({
        "name": format!("{} {}", kind.title(), suffix),
        "description": "",
        "renders": ["application/json"],
        "parses": ["application/json"],
    });
    if let Some(method) = write_method {
        let mut actions = Map::new();
        actions.insert(method.to_string(), Value::Object(field_descriptions(kind)));
        body["actions"] = Value::Object(actions);
    }
    body
}

fn field_descriptions(kind: RecordKind) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "url".to_string(),
        json!({ "type": "field", "required": false, "read_only": true, "label": "Url" }),
    );
    for column in kind.columns() {
        let read_only = kind.read_only().contains(&column.name);
        let field_type = if column.name == PICTURE_FIELD {
            "image upload"
        } else if kind.link(column.name).is_some() {
            "field"
        } else if kind.choices(column.name).is_some() {
            "choice"
        } else {
            column.field_type.label()
        };
        let mut description = json!({
            "type": field_type,
            "required": column.required && !read_only,
            "read_only": read_only,
            "label": label(column.name),
        });
        if let Some(choices) = kind.choices(column.name) {
            description["choices"] = choices
                .iter()
                .map(|choice| json!({ "value": choice, "display_name": label(choice) }))
                .collect();
        }
        fields.insert(column.name.to_string(), description);
    }
    fields
}

fn label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/////////////////////////////////////////////// handlers ///////////////////////////////////////////////

async fn list<R: Record>(
    State(state): State<AppState>,
    base: BaseUrl,
) -> Result<Json<Vec<Value>>, ApiError> {
    let rows = state.records.list(R::KIND).await?;
    Ok(Json(
        rows.iter()
            .map(|row| represent(R::KIND, row, &base, &state.config))
            .collect(),
    ))
}

async fn create<R: Record>(
    State(state): State<AppState>,
    base: BaseUrl,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let input = json_body(&headers, &body)?;
    let (record, row) = prepare::<R>(WriteMode::Create, input, None)?;
    state.records.insert(R::KIND, &row).await?;
    tracing::info!(kind = %R::KIND, id = %record.id(), "created record");
    let location = base.item_url(R::KIND, record.id());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(represent(R::KIND, &row, &base, &state.config)),
    )
        .into_response())
}

async fn retrieve<R: Record>(
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let row = state.records.get(R::KIND, id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(represent(R::KIND, &row, &base, &state.config)))
}

async fn write<R: Record>(
    state: &AppState,
    base: &BaseUrl,
    id: &str,
    headers: &HeaderMap,
    body: &Bytes,
    mode: WriteMode,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(id)?;
    let existing = state.records.get(R::KIND, id).await?.ok_or(ApiError::NotFound)?;
    let input = json_body(headers, body)?;
    let (_, row) = prepare::<R>(mode, input, Some(&existing))?;
    state.records.update(R::KIND, id, &row).await?;
    tracing::info!(kind = %R::KIND, id = %id, mode = ?mode, "updated record");
    Ok(Json(represent(R::KIND, &row, base, &state.config)))
}

async fn replace<R: Record>(
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    write::<R>(&state, &base, &id, &headers, &body, WriteMode::Replace).await
}

async fn partial_update<R: Record>(
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    write::<R>(&state, &base, &id, &headers, &body, WriteMode::Partial).await
}

async fn destroy<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    if !state.records.delete(R::KIND, id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(kind = %R::KIND, id = %id, "deleted record");
    Ok(StatusCode::NO_CONTENT)
}

async fn options_list<R: Record>(Extension(identity): Extension<Identity>) -> Json<Value> {
    let method = Method::POST;
    let allowed = has_permission(&method, &identity);
    Json(metadata(R::KIND, "List", allowed.then_some(&method)))
}

async fn options_detail<R: Record>(Extension(identity): Extension<Identity>) -> Json<Value> {
    let method = Method::PUT;
    let allowed = has_permission(&method, &identity);
    Json(metadata(R::KIND, "Instance", allowed.then_some(&method)))
}

/// Query string of a picture upload.
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Original file name; only its sanitized form reaches the object key.
    pub filename: Option<String>,
}

async fn upload_picture(
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let mut row = state
        .records
        .get(RecordKind::Flora, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    if body.is_empty() {
        let mut errors = FieldErrors::new();
        errors.add(PICTURE_FIELD, "The submitted file is empty.");
        return Err(ApiError::Validation(errors));
    }
    let key = object_key(query.filename.as_deref().unwrap_or("upload"));
    let bucket = &state.config.image_bucket;
    state.objects.ensure_bucket(bucket).await?;
    state.objects.put(bucket, &key, body.to_vec()).await?;
    tracing::info!(bucket = %bucket, key = %key, flora = %id, "stored picture");
    if let Some(object) = row.as_object_mut() {
        object.insert(PICTURE_FIELD.to_string(), Value::String(key));
    }
    state.records.update(RecordKind::Flora, id, &row).await?;
    Ok(Json(represent(RecordKind::Flora, &row, &base, &state.config)))
}

/// `GET /api/`: the URL of every collection.
async fn api_root(base: BaseUrl) -> Json<Value> {
    let mut root = Map::new();
    for kind in RecordKind::ALL {
        root.insert(
            kind.collection().to_string(),
            Value::String(base.collection_url(kind)),
        );
    }
    Json(Value::Object(root))
}

//////////////////////////////////////////////// Router ////////////////////////////////////////////////

fn resource<R: Record>() -> Router<AppState> {
    let collection = format!("/api/{}/", R::KIND.collection());
    let item = format!("/api/{}/:id/", R::KIND.collection());
    Router::new()
        .route(
            &collection,
            get(list::<R>).post(create::<R>).options(options_list::<R>),
        )
        .route(
            &item,
            get(retrieve::<R>)
                .put(replace::<R>)
                .patch(partial_update::<R>)
                .delete(destroy::<R>)
                .options(options_detail::<R>),
        )
}

/// The REST API: every resource behind token authentication and the permission rule, plus
/// the public API root.
pub fn api_router(state: AppState) -> Router<AppState> {
    let resources = Router::new()
        .merge(resource::<Flora>())
        .merge(resource::<Taxon>())
        .merge(resource::<CollectPlace>())
        .merge(resource::<Coord>())
        .merge(resource::<Herbarium>())
        .merge(resource::<Label>())
        .merge(resource::<Comment>())
        .route("/api/floras/:id/picture/", put(upload_picture))
        .route_layer(middleware::from_fn_with_state(state, require_permission));
    Router::new().route("/api/", get(api_root)).merge(resources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseUrl {
        BaseUrl("http://garden.test".to_string())
    }

    #[test]
    fn links_accept_uuids_paths_and_urls() {
        let id = Uuid::new_v4();
        assert_eq!(parse_link(RecordKind::Taxon, &id.to_string()), Ok(id));
        assert_eq!(
            parse_link(RecordKind::Taxon, &format!("/api/taxons/{}/", id)),
            Ok(id)
        );
        assert_eq!(
            parse_link(RecordKind::Taxon, &format!("http://elsewhere:8000/api/taxons/{}/", id)),
            Ok(id)
        );
    }

    #[test]
    fn links_to_the_wrong_collection_fail() {
        let id = Uuid::new_v4();
        assert_eq!(
            parse_link(RecordKind::Taxon, &format!("/api/coords/{}/", id)),
            Err(INCORRECT_URL_MATCH)
        );
        assert_eq!(parse_link(RecordKind::Taxon, "not a link"), Err(NO_URL_MATCH));
        assert_eq!(parse_link(RecordKind::Taxon, "/floras/"), Err(NO_URL_MATCH));
        assert_eq!(
            parse_link(RecordKind::Taxon, "/api/taxons/123/"),
            Err(OBJECT_DOES_NOT_EXIST)
        );
    }

    #[test]
    fn representation_adds_hyperlinks() {
        let id = Uuid::new_v4();
        let place = Uuid::new_v4();
        let row = json!({
            "id": id,
            "author": "Ford",
            "taxonomycol": "Forda",
            "collect_place": place,
            "taxon": null,
            "picture": "2024-05-01/abc-leaf.png",
        });
        let config = GardenConfig::default();
        let out = represent(RecordKind::Flora, &row, &base(), &config);
        assert_eq!(out["url"], format!("http://garden.test/api/floras/{}/", id));
        assert_eq!(
            out["collect_place"],
            format!("http://garden.test/api/collect_places/{}/", place)
        );
        assert_eq!(out["taxon"], Value::Null);
        assert_eq!(
            out["picture"],
            "http://garden.test/media/images/2024-05-01/abc-leaf.png"
        );
    }

    #[test]
    fn create_requires_fields() {
        let err = prepare::<Taxon>(WriteMode::Create, json!({ "genus": "asd" }), None).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("species").unwrap(), ["This field is required."]);
        assert!(errors.get("genus").is_none());
    }

    #[test]
    fn create_ignores_read_only_fields_and_assigns_id() {
        let chosen = Uuid::new_v4();
        let (taxon, row) = prepare::<Taxon>(
            WriteMode::Create,
            json!({ "id": chosen, "url": "x", "genus": "asd", "species": "asd" }),
            None,
        )
        .unwrap();
        assert_ne!(taxon.id, chosen);
        assert_eq!(row["id"], json!(taxon.id));
        assert!(row.get("url").is_none());
    }

    #[test]
    fn partial_and_replace_keep_omitted_fields() {
        let existing = json!({
            "id": Uuid::new_v4(),
            "genus": "asd",
            "species": "asd",
            "family": "Rosaceae",
        });
        let (patched, _) =
            prepare::<Taxon>(WriteMode::Partial, json!({ "species": "qwe" }), Some(&existing))
                .unwrap();
        assert_eq!(patched.species, "qwe");
        assert_eq!(patched.family.as_deref(), Some("Rosaceae"));
        assert_eq!(json!(patched.id), existing["id"]);

        let (replaced, _) = prepare::<Taxon>(
            WriteMode::Replace,
            json!({ "genus": "zxc", "species": "qwe" }),
            Some(&existing),
        )
        .unwrap();
        assert_eq!(replaced.genus, "zxc");
        assert_eq!(replaced.family.as_deref(), Some("Rosaceae"));
        assert_eq!(json!(replaced.id), existing["id"]);

        let err = prepare::<Taxon>(WriteMode::Replace, json!({ "genus": "zxc" }), Some(&existing))
            .unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("species").unwrap(), ["This field is required."]);
    }

    #[test]
    fn replace_keeps_links_and_timestamps() {
        let place = Uuid::new_v4();
        let existing = json!({
            "id": Uuid::new_v4(),
            "author": "Ford",
            "taxonomycol": "Forda",
            "geo_author": "Geo",
            "created": "2020-01-01T00:00:00Z",
            "collect_place": place,
        });
        let (flora, _) = prepare::<Flora>(
            WriteMode::Replace,
            json!({ "author": "Fordd", "taxonomycol": "Forda" }),
            Some(&existing),
        )
        .unwrap();
        assert_eq!(flora.author, "Fordd");
        assert_eq!(flora.geo_author.as_deref(), Some("Geo"));
        assert_eq!(flora.collect_place, Some(place));
        assert_eq!(flora.created.unwrap().to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }

    #[test]
    fn replace_keeps_the_picture() {
        let existing = json!({
            "id": Uuid::new_v4(),
            "author": "Ford",
            "taxonomycol": "Forda",
            "picture": "2024-05-01/abc-leaf.png",
        });
        let (flora, _) = prepare::<Flora>(
            WriteMode::Replace,
            json!({ "author": "Ford", "taxonomycol": "Forda", "picture": "other.png" }),
            Some(&existing),
        )
        .unwrap();
        assert_eq!(flora.picture.as_deref(), Some("2024-05-01/abc-leaf.png"));
    }

    #[test]
    fn alias_and_hyperlink_input() {
        let taxon = Uuid::new_v4();
        let (flora, _) = prepare::<Flora>(
            WriteMode::Create,
            json!({
                "author": "Ford",
                "taxonomycol": "Forda",
                "rus_name": "Форда",
                "taxon": format!("http://garden.test/api/taxons/{}/", taxon),
                "comment": "",
            }),
            None,
        )
        .unwrap();
        assert_eq!(flora.local_name.as_deref(), Some("Форда"));
        assert_eq!(flora.taxon, Some(taxon));
        assert_eq!(flora.comment, None);
    }

    #[test]
    fn null_for_a_required_field() {
        let err = prepare::<Taxon>(
            WriteMode::Create,
            json!({ "genus": null, "species": "asd" }),
            None,
        )
        .unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.get("genus").unwrap(), ["This field may not be null."]);
    }

    #[test]
    fn validation_failures_surface() {
        let err = prepare::<Coord>(
            WriteMode::Create,
            json!({ "altitude": -1, "longitude": 21.433, "latitude": 12.343 }),
            None,
        )
        .unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.get("altitude").is_some());
    }

    #[test]
    fn metadata_hides_actions_from_readers() {
        let body = metadata(RecordKind::Flora, "List", None);
        assert_eq!(body["name"], "Flora List");
        assert!(body.get("actions").is_none());

        let body = metadata(RecordKind::Flora, "List", Some(&Method::POST));
        let fields = &body["actions"]["POST"];
        assert_eq!(fields["picture"]["type"], "image upload");
        assert_eq!(fields["picture"]["read_only"], true);
        assert_eq!(fields["author"]["required"], true);
        assert_eq!(fields["taxon"]["type"], "field");
        assert_eq!(fields["autochthony"]["type"], "choice");
        assert_eq!(fields["local_name"]["label"], "Local name");
    }

    #[test]
    fn bodies_must_be_json() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            json_body(&headers, &Bytes::from_static(b"genus=asd")),
            Err(ApiError::UnsupportedMediaType(_))
        ));
        headers.insert(header::CONTENT_TYPE, "application/json; charset=utf-8".parse().unwrap());
        assert!(matches!(
            json_body(&headers, &Bytes::from_static(b"{")),
            Err(ApiError::MalformedPayload(_))
        ));
        assert_eq!(json_body(&headers, &Bytes::new()).unwrap(), json!({}));
    }
}
