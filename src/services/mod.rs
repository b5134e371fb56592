//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They:
//! - Validate input and apply business rules
//! - Coordinate repositories and the cache
//! - Report failures through one error enum per service

pub mod comment;
pub mod contact;
pub mod content;
pub mod export;
pub mod gallery;
pub mod jwt;
pub mod markdown;
pub mod oembed;
pub mod order;
pub mod password;
pub mod product;
pub mod rate_limiter;
pub mod review;
pub mod search;
pub mod settings;
pub mod shop_auth;
pub mod sitemap;
pub mod slug;
pub mod subscriber;
pub mod translation;
pub mod upload;
pub mod user;
pub mod validation;

pub use comment::{CommentService, CommentServiceError};
pub use contact::{ContactService, ContactServiceError};
pub use content::{ContentService, ContentServiceError};
pub use gallery::{GalleryService, GalleryServiceError};
pub use jwt::{Claims, JwtManager, TokenError};
pub use markdown::MarkdownRenderer;
pub use oembed::{OEmbedClient, OEmbedError, VideoEmbed};
pub use order::{OrderService, OrderServiceError};
pub use password::{hash_password, verify_password};
pub use product::{ProductService, ProductServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use review::{ReviewService, ReviewServiceError};
pub use search::{SearchService, SearchServiceError};
pub use settings::{FooterSettings, SettingsService, SettingsServiceError};
pub use shop_auth::{ShopAuthError, ShopAuthService};
pub use slug::generate_slug;
pub use subscriber::{SubscriberService, SubscriberServiceError};
pub use translation::{TranslationService, TranslationServiceError};
pub use upload::{StoredUpload, UploadError, UploadService};
pub use user::{LoginOutcome, UserService, UserServiceError};
