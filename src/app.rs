//! Application wiring
//!
//! Builds the shared `AppState` from configuration, a migrated pool and a
//! cache. Used by `main` and by the integration tests.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::api::{AppState, RequestStats};
use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAdminUserRepository, SqlxCommentRepository, SqlxContactRepository,
    SqlxContentRepository, SqlxGalleryRepository, SqlxOrderRepository, SqlxProductRepository,
    SqlxReviewRepository, SqlxSettingsRepository, SqlxShopAccountRepository,
    SqlxSubscriberRepository, SqlxTranslationRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    CommentService, ContactService, ContentService, GalleryService, JwtManager,
    LoginRateLimiter, MarkdownRenderer, OEmbedClient, OrderService, ProductService,
    ReviewService, SearchService, SettingsService, ShopAuthService, SubscriberService,
    TranslationService, UploadService, UserService,
};
use crate::views::PageRenderer;

/// How often expired sessions and stale login attempts are swept
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

pub fn build_state(config: Config, pool: DynDatabasePool, cache: Arc<Cache>) -> Result<AppState> {
    let markdown = MarkdownRenderer::new();
    let rate_limiter = Arc::new(LoginRateLimiter::new());
    let jwt = Arc::new(JwtManager::from_config(&config.auth));

    let content_repo = SqlxContentRepository::boxed(pool.clone());
    let product_repo = SqlxProductRepository::boxed(pool.clone());

    let content_service = Arc::new(ContentService::new(
        content_repo.clone(),
        cache.clone(),
        markdown.clone(),
    ));
    let search_service = Arc::new(SearchService::new(content_repo.clone()));
    let comment_service = Arc::new(CommentService::new(
        SqlxCommentRepository::boxed(pool.clone()),
        content_repo,
    ));
    let subscriber_service = Arc::new(SubscriberService::new(SqlxSubscriberRepository::boxed(pool.clone())));
    let contact_service = Arc::new(ContactService::new(SqlxContactRepository::boxed(pool.clone())));
    let settings_service = Arc::new(SettingsService::new(
        SqlxSettingsRepository::boxed(pool.clone()),
        cache.clone(),
    ));
    let translation_service = Arc::new(TranslationService::new(
        SqlxTranslationRepository::boxed(pool.clone()),
        cache.clone(),
    ));
    let user_service = Arc::new(UserService::new(
        SqlxAdminUserRepository::boxed(pool.clone()),
        jwt.clone(),
        rate_limiter.clone(),
    ));
    let shop_auth_service = Arc::new(ShopAuthService::new(
        SqlxShopAccountRepository::boxed(pool.clone()),
        rate_limiter.clone(),
        config.auth.shop_session_days,
    ));

    let product_service = Arc::new(ProductService::new(product_repo.clone(), cache));
    let gallery_service = Arc::new(GalleryService::new(SqlxGalleryRepository::boxed(pool.clone())));
    let review_service = Arc::new(ReviewService::new(
        SqlxReviewRepository::boxed(pool.clone()),
        product_repo.clone(),
    ));
    let order_service = Arc::new(OrderService::new(SqlxOrderRepository::boxed(pool), product_repo));

    let upload_service = Arc::new(UploadService::new(config.upload.clone()));
    let oembed_client = Arc::new(OEmbedClient::new(&config.oembed).context("Failed to build oEmbed client")?);
    let pages = Arc::new(PageRenderer::new()?);

    Ok(AppState {
        config: Arc::new(config),
        markdown,
        content_service,
        search_service,
        comment_service,
        subscriber_service,
        contact_service,
        settings_service,
        translation_service,
        user_service,
        jwt,
        shop_auth_service,
        upload_service,
        oembed_client,
        product_service,
        gallery_service,
        review_service,
        order_service,
        pages,
        request_stats: Arc::new(RequestStats::new()),
        rate_limiter,
    })
}

/// Periodically drop expired shop sessions and old login attempts
pub fn spawn_cleanup(state: &AppState) -> tokio::task::JoinHandle<()> {
    let shop_auth = state.shop_auth_service.clone();
    let limiter = state.rate_limiter.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
            match shop_auth.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Purged {} expired shop sessions", n),
                Err(e) => tracing::warn!("Failed to purge shop sessions: {}", e),
            }
        }
    })
}
