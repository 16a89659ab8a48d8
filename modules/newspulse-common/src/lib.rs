pub mod config;
pub mod identity;
pub mod types;

pub use config::Config;
pub use identity::{Identity, IdentityError};
pub use types::{AlertRecord, Article, ArticleId, Category, DeliveryMethod, Frequency, Preferences};
