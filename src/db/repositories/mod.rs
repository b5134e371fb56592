//! Database repositories
//!
//! One repository per entity. Each exposes an `async_trait` interface and a
//! `Sqlx*Repository` implementation that works against either backend.

pub mod admin_user;
pub mod comment;
pub mod contact;
pub mod content;
pub mod gallery;
pub mod order;
pub mod product;
pub mod review;
pub mod settings;
pub mod shop_account;
pub mod subscriber;
pub mod translation;

pub use admin_user::{AdminUserRepository, SqlxAdminUserRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use content::{ContentRepository, SqlxContentRepository};
pub use gallery::{GalleryRepository, SqlxGalleryRepository};
pub use order::{OrderRepository, SqlxOrderRepository};
pub use product::{ProductRepository, SqlxProductRepository};
pub use review::{ReviewRepository, SqlxReviewRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use shop_account::{ShopAccountRepository, SqlxShopAccountRepository};
pub use subscriber::{SqlxSubscriberRepository, SubscriberRepository};
pub use translation::{SqlxTranslationRepository, TranslationRepository};
