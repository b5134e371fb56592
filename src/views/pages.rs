//! Page handlers
//!
//! - GET /                     - Latest items of each kind
//! - GET /{kind}               - Paginated list, `?page=2&category=fiqh`
//! - GET /{kind}/{slug}        - Detail page with approved comments
//! - GET /shop                 - Product grid and gallery
//! - GET /shop/products/{id}   - Product page with approved reviews
//! - GET /sitemap.xml
//! - GET /robots.txt

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tera::Context;

use super::{nav_links, PageRenderer};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Content, ContentKind, ListParams, ProductFilter};
use crate::services::{
    oembed::{extract_youtube_id, youtube_embed_url},
    sitemap::{build_sitemap, content_path, robots_txt},
    FooterSettings,
};

/// Items per section on the home page
const HOME_SECTION_SIZE: u32 = 6;

#[derive(Debug, Default, Deserialize)]
pub struct ListPageQuery {
    pub page: Option<u32>,
    pub category: Option<String>,
}

/// Content as shown on cards, with the display date already formatted
#[derive(Debug, Serialize)]
struct ContentCard {
    title: String,
    url: String,
    summary: String,
    thumbnail: Option<String>,
    author_name: String,
    category: String,
    date: String,
}

impl From<&Content> for ContentCard {
    fn from(content: &Content) -> Self {
        Self {
            title: content.title.clone(),
            url: content_path(content.kind, &content.slug),
            summary: content.summary.clone(),
            thumbnail: content.thumbnail.clone(),
            author_name: content.author_name.clone(),
            category: content.category.clone(),
            date: display_date(content.published_at.unwrap_or(content.created_at)),
        }
    }
}

#[derive(Debug, Serialize)]
struct HomeSection {
    label: &'static str,
    url: String,
    items: Vec<ContentCard>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/shop", get(shop))
        .route("/shop/products/{id}", get(product))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
        .route("/{kind}", get(list))
        .route("/{kind}/{slug}", get(detail))
        .fallback(not_found)
}

// ============================================================================
// Handlers
// ============================================================================

async fn home(State(state): State<AppState>) -> Response {
    let page = render_home(&state).await;
    respond(&state, page).await
}

async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListPageQuery>,
) -> Response {
    let page = render_list(&state, &kind, query).await;
    respond(&state, page).await
}

async fn detail(
    State(state): State<AppState>,
    Path((kind, slug)): Path<(String, String)>,
) -> Response {
    let page = render_detail(&state, &kind, &slug).await;
    respond(&state, page).await
}

async fn shop(State(state): State<AppState>) -> Response {
    let page = render_shop(&state).await;
    respond(&state, page).await
}

async fn product(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let page = render_product(&state, id).await;
    respond(&state, page).await
}

async fn not_found(State(state): State<AppState>) -> Response {
    error_page(&state, ApiError::not_found("Page not found")).await
}

async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (contents, products) = tokio::try_join!(
        async { state.content_service.all_published().await.map_err(ApiError::from) },
        async {
            state
                .product_service
                .list_active(ProductFilter::default())
                .await
                .map_err(ApiError::from)
        },
    )?;

    let xml = build_sitemap(&state.config.server.site_url, &contents, &products);
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml))
}

async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&state.config.server.site_url),
    )
}

// ============================================================================
// Rendering
// ============================================================================

async fn render_home(state: &AppState) -> Result<String, ApiError> {
    let latest = futures::future::try_join_all(
        ContentKind::ALL
            .iter()
            .map(|kind| state.content_service.latest(*kind, HOME_SECTION_SIZE)),
    )
    .await?;

    let sections: Vec<HomeSection> = ContentKind::ALL
        .iter()
        .zip(latest)
        .map(|(kind, items)| HomeSection {
            label: kind.label(),
            url: format!("/{}", kind.route_slug()),
            items: items.iter().map(ContentCard::from).collect(),
        })
        .collect();

    let mut ctx = page_context(state).await;
    ctx.insert("sections", &sections);
    render(state, "home.html", &ctx)
}

async fn render_list(state: &AppState, segment: &str, query: ListPageQuery) -> Result<String, ApiError> {
    let kind = page_kind(segment)?;
    let params = ListParams::from_query(query.page, None);
    let category = query.category.as_deref().filter(|c| !c.trim().is_empty());

    let (result, categories) = tokio::try_join!(
        async {
            state
                .content_service
                .list_published(kind, category, None, &params)
                .await
                .map_err(ApiError::from)
        },
        async { state.content_service.categories(kind).await.map_err(ApiError::from) },
    )?;

    let base_url = format!("/{}", kind.route_slug());
    let page_url = |page: u32| {
        let mut url = format!("{}?page={}", base_url, page);
        if let Some(category) = category {
            url.push_str("&category=");
            url.push_str(&urlencoding::encode(category));
        }
        url
    };

    let items: Vec<ContentCard> = result.items.iter().map(ContentCard::from).collect();

    let mut ctx = page_context(state).await;
    ctx.insert("label", kind.label());
    ctx.insert("base_url", &base_url);
    ctx.insert("categories", &categories);
    ctx.insert("items", &items);
    ctx.insert("prev_url", &result.has_prev().then(|| page_url(result.page - 1)));
    ctx.insert("next_url", &result.has_next().then(|| page_url(result.page + 1)));
    render(state, "list.html", &ctx)
}

async fn render_detail(state: &AppState, segment: &str, slug: &str) -> Result<String, ApiError> {
    let kind = page_kind(segment)?;

    state.content_service.record_view(kind, slug).await?;
    let (content, comments) = tokio::try_join!(
        async { state.content_service.get_published(kind, slug).await.map_err(ApiError::from) },
        async { state.comment_service.list_approved(kind, slug).await.map_err(ApiError::from) },
    )?;

    let embed_url = match kind {
        ContentKind::Video => content
            .media_url
            .as_deref()
            .and_then(extract_youtube_id)
            .map(|id| youtube_embed_url(&id)),
        _ => None,
    };

    let mut ctx = page_context(state).await;
    ctx.insert("kind_label", kind.label());
    ctx.insert("route", kind.route_slug());
    ctx.insert("date", &display_date(content.published_at.unwrap_or(content.created_at)));
    ctx.insert("embed_url", &embed_url);
    ctx.insert("content", &content);
    ctx.insert("comments", &comments);
    render(state, "detail.html", &ctx)
}

async fn render_shop(state: &AppState) -> Result<String, ApiError> {
    let (products, gallery) = tokio::try_join!(
        async {
            state
                .product_service
                .list_active(ProductFilter::default())
                .await
                .map_err(ApiError::from)
        },
        async { state.gallery_service.list().await.map_err(ApiError::from) },
    )?;

    let mut ctx = page_context(state).await;
    ctx.insert("products", &products);
    ctx.insert("gallery", &gallery);
    render(state, "shop.html", &ctx)
}

async fn render_product(state: &AppState, id: i64) -> Result<String, ApiError> {
    let product = state.product_service.get_active(id).await?;
    let reviews = state.review_service.list_approved(id).await?;

    let mut ctx = page_context(state).await;
    ctx.insert("product", &product);
    ctx.insert("reviews", &reviews);
    render(state, "product.html", &ctx)
}

// ============================================================================
// Helpers
// ============================================================================

fn page_kind(segment: &str) -> Result<ContentKind, ApiError> {
    ContentKind::from_route_slug(segment).ok_or_else(|| ApiError::not_found("Page not found"))
}

fn display_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Context shared by every page
async fn page_context(state: &AppState) -> Context {
    let footer = match state.settings_service.footer().await {
        Ok(footer) => footer,
        Err(e) => {
            tracing::warn!("Failed to load footer settings, using defaults: {}", e);
            FooterSettings::default()
        }
    };

    let mut ctx = Context::new();
    ctx.insert("footer", &footer);
    ctx.insert("nav", &nav_links());
    ctx
}

fn render(state: &AppState, template: &str, ctx: &Context) -> Result<String, ApiError> {
    state.pages.render(template, ctx).map_err(ApiError::internal)
}

async fn respond(state: &AppState, page: Result<String, ApiError>) -> Response {
    match page {
        Ok(html) => Html(html).into_response(),
        Err(err) => error_page(state, err).await,
    }
}

async fn error_page(state: &AppState, err: ApiError) -> Response {
    let status = err.status();
    let heading = match status {
        StatusCode::NOT_FOUND => "Page not found",
        StatusCode::BAD_REQUEST => "Bad request",
        _ => "Something went wrong",
    };

    let mut ctx = page_context(state).await;
    ctx.insert("status", &status.as_u16());
    ctx.insert("heading", heading);
    ctx.insert("message", &err.error.message);

    let html = state.pages.render("error.html", &ctx).unwrap_or_else(|e| {
        tracing::error!("Failed to render error page: {}", e);
        PageRenderer::fallback_page(status.as_u16(), &err.error.message)
    });
    (status, Html(html)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_display_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(display_date(at), "March 7, 2024");
    }

    #[test]
    fn test_page_kind() {
        assert_eq!(page_kind("community").unwrap(), ContentKind::CommunityPost);
        assert_eq!(page_kind("videos").unwrap(), ContentKind::Video);
        assert_eq!(page_kind("posts").unwrap_err().status(), StatusCode::NOT_FOUND);
    }
}
