//! Data models
//!
//! Database rows (derived with `sqlx::FromRow`), request inputs and the
//! small value types shared between repositories, services and handlers.

mod admin_user;
mod comment;
mod contact;
mod content;
mod order;
mod product;
mod shop_account;
mod subscriber;
mod translation;

pub use admin_user::{AdminRole, AdminUser, CreateAdminUserInput, LoginInput};
pub use comment::{gravatar_url, Comment, CreateCommentInput, PublicComment};
pub use contact::{ContactInput, ContactMessage};
pub use content::{
    Content, ContentDraft, ContentFilter, ContentKind, CreateContentInput, ListParams,
    PagedResult, PublishStatus, UpdateContentInput,
};
pub use order::{
    NewOrder, Order, OrderItemInput, OrderLine, OrderLines, OrderStatus, PlaceOrderInput,
};
pub use product::{
    CreateGalleryImageInput, CreateProductInput, CreateReviewInput, GalleryImage, Product,
    ProductFilter, Review, UpdateProductInput,
};
pub use shop_account::{CreateShopAccountInput, ShopAccount, ShopLoginInput, ShopSession};
pub use subscriber::{SubscribeInput, Subscriber};
pub use translation::{Translation, UpsertTranslationInput};

/// A database string that does not name a variant of the expected enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {what}: {value}")]
pub struct ParseEnumError {
    what: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}
