//! # Web pages
//!
//! Server-rendered HTML over the same stores as the API.  The home page is public; list
//! and detail pages need a login session.  Like the API resources, the list and detail
//! handlers are generic over [`Record`] and get everything else from the [`RecordKind`].

use std::fmt::Write;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::PICTURE_FIELD;
use crate::auth::{MaybeSessionUser, SessionUser};
use crate::config::GardenConfig;
use crate::errors::ApiError;
use crate::html::{escape, layout};
use crate::paginate::{PAGE_SIZE, Page, paginate};
use crate::record::{Record, RecordKind};
use crate::state::AppState;
use crate::{CollectPlace, Comment, Coord, Flora, Herbarium, Label, Taxon};

/// Query string of a list page.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Requested page number, parsed leniently.
    pub page: Option<String>,
}

/// Query string of a detail page.
#[derive(Debug, Default, Deserialize)]
pub struct DetailQuery {
    /// Id of the record to show.
    pub id: Option<String>,
}

//////////////////////////////////////////////// cells /////////////////////////////////////////////////

/// Path of the detail page of a record.
pub fn detail_path(kind: RecordKind, id: &str) -> String {
    format!("/{}/?id={}", kind.singular(), id)
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape(s),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        other => escape(&other.to_string()),
    }
}

fn field_cell(kind: RecordKind, field: &str, row: &Value, config: &GardenConfig) -> String {
    let value = row.get(field).unwrap_or(&Value::Null);
    if let (Some(link), Value::String(target)) = (kind.link(field), value) {
        return format!(
            "<a href=\"{}\">{}</a>",
            escape(&detail_path(link.target, target)),
            escape(link.target.title())
        );
    }
    if field == PICTURE_FIELD {
        if let Value::String(key) = value {
            return format!(
                "<img src=\"{}\" alt=\"picture\">",
                escape(&config.object_url("", key))
            );
        }
    }
    text(value)
}

////////////////////////////////////////////// rendering ///////////////////////////////////////////////

fn render_list(kind: RecordKind, page: &Page<Value>, config: &GardenConfig) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<p class=\"count\">{} records</p>", page.count);
    body.push_str("<table>\n<thead><tr>");
    for field in kind.summary() {
        let _ = write!(body, "<th>{}</th>", escape(field));
    }
    body.push_str("<th></th></tr></thead>\n<tbody>\n");
    for row in &page.items {
        body.push_str("<tr>");
        for field in kind.summary() {
            let _ = write!(body, "<td>{}</td>", field_cell(kind, field, row, config));
        }
        let id = row.get("id").and_then(Value::as_str).unwrap_or_default();
        let _ = writeln!(
            body,
            "<td><a href=\"{}\">details</a></td></tr>",
            escape(&detail_path(kind, id))
        );
    }
    body.push_str("</tbody>\n</table>\n");
    body.push_str(&render_pager(kind, page));
    body
}

fn render_pager<T>(kind: RecordKind, page: &Page<T>) -> String {
    let link = |number: usize| format!("/{}/?page={}", kind.collection(), number);
    let mut nav = String::from("<nav class=\"pagination\">\n");
    if page.has_previous() {
        let _ = writeln!(nav, "<a href=\"{}\">previous</a>", link(page.number - 1));
    }
    for number in page.page_range() {
        if number == page.number {
            let _ = writeln!(nav, "<span class=\"current\">{}</span>", number);
        } else {
            let _ = writeln!(nav, "<a href=\"{}\">{}</a>", link(number), number);
        }
    }
    if page.has_next() {
        let _ = writeln!(nav, "<a href=\"{}\">next</a>", link(page.number + 1));
    }
    let _ = writeln!(
        nav,
        "<span class=\"position\">Page {} of {}</span>\n</nav>",
        page.number, page.num_pages
    );
    nav
}

fn render_detail(kind: RecordKind, row: &Value, config: &GardenConfig) -> String {
    let mut body = String::from("<dl>\n");
    for column in kind.columns() {
        let _ = writeln!(
            body,
            "<dt>{}</dt><dd>{}</dd>",
            escape(column.name),
            field_cell(kind, column.name, row, config)
        );
    }
    body.push_str("</dl>\n");
    let _ = writeln!(
        body,
        "<p><a href=\"/{}/\">All {}</a></p>",
        kind.collection(),
        escape(&kind.title().to_lowercase())
    );
    body
}

fn not_found(user: Option<&str>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(layout("Not found", user, "<p>The requested record does not exist.</p>")),
    )
        .into_response()
}

/////////////////////////////////////////////// handlers ///////////////////////////////////////////////

/// `GET /`: how many records of each kind the catalog holds.
async fn home(State(state): State<AppState>, visitor: MaybeSessionUser) -> Result<Html<String>, ApiError> {
    let mut body = String::from("<ul class=\"summary\">\n");
    for kind in RecordKind::ALL {
        let count = state.records.count(kind).await?;
        let _ = writeln!(
            body,
            "<li><a href=\"/{}/\">{}</a>: {}</li>",
            kind.collection(),
            escape(kind.title()),
            count
        );
    }
    body.push_str("</ul>\n");
    Ok(Html(layout("Garden", visitor.username(), &body)))
}

async fn list_page<R: Record>(
    State(state): State<AppState>,
    SessionUser(account): SessionUser,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    let rows = state.records.list(R::KIND).await?;
    let page = paginate(rows, PAGE_SIZE, query.page.as_deref());
    tracing::debug!(kind = %R::KIND, page = page.number, pages = page.num_pages, "list page");
    let body = render_list(R::KIND, &page, &state.config);
    Ok(Html(layout(R::KIND.title(), Some(&account.username), &body)))
}

async fn detail_page<R: Record>(
    State(state): State<AppState>,
    SessionUser(account): SessionUser,
    Query(query): Query<DetailQuery>,
) -> Result<Response, ApiError> {
    let user = Some(account.username.as_str());
    let Some(raw) = query.id.filter(|id| !id.trim().is_empty()) else {
        return Ok(Html(layout(R::KIND.title(), user, "<p>Nothing selected.</p>")).into_response());
    };
    let Ok(id) = Uuid::parse_str(raw.trim()) else {
        return Ok(not_found(user));
    };
    match state.records.get(R::KIND, id).await? {
        Some(row) => {
            let body = render_detail(R::KIND, &row, &state.config);
            Ok(Html(layout(R::KIND.title(), user, &body)).into_response())
        }
        None => Ok(not_found(user)),
    }
}

//////////////////////////////////////////////// Router ////////////////////////////////////////////////

fn pages_for<R: Record>() -> Router<AppState> {
    Router::new()
        .route(&format!("/{}/", R::KIND.collection()), get(list_page::<R>))
        .route(&format!("/{}/", R::KIND.singular()), get(detail_page::<R>))
}

/// Home, list and detail pages.
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .merge(pages_for::<Flora>())
        .merge(pages_for::<Taxon>())
        .merge(pages_for::<CollectPlace>())
        .merge(pages_for::<Coord>())
        .merge(pages_for::<Herbarium>())
        .merge(pages_for::<Label>())
        .merge(pages_for::<Comment>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn links_point_at_detail_pages() {
        let place = Uuid::new_v4();
        let row = json!({ "collect_place": place, "author": "<Ford>" });
        let config = GardenConfig::default();
        assert_eq!(
            field_cell(RecordKind::Flora, "collect_place", &row, &config),
            format!("<a href=\"/collect_place/?id={}\">Collect place</a>", place)
        );
        assert_eq!(field_cell(RecordKind::Flora, "author", &row, &config), "&lt;Ford&gt;");
        assert_eq!(field_cell(RecordKind::Flora, "taxon", &row, &config), "");
    }

    #[test]
    fn pictures_render_as_images() {
        let row = json!({ "picture": "2024-05-01/abc-leaf.png" });
        let cell = field_cell(RecordKind::Flora, "picture", &row, &GardenConfig::default());
        assert_eq!(
            cell,
            "<img src=\"/media/images/2024-05-01/abc-leaf.png\" alt=\"picture\">"
        );
    }

    #[test]
    fn pager_marks_the_current_page() {
        let page = paginate((0..25).collect::<Vec<_>>(), PAGE_SIZE, Some("2"));
        let nav = render_pager(RecordKind::Taxon, &page);
        assert!(nav.contains("<a href=\"/taxons/?page=1\">previous</a>"));
        assert!(nav.contains("<span class=\"current\">2</span>"));
        assert!(nav.contains("<a href=\"/taxons/?page=3\">next</a>"));
        assert!(nav.contains("Page 2 of 3"));
    }
}
