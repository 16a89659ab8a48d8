pub mod archive;
pub mod bookmarks;
pub mod error;
pub mod feed;
pub mod filter;
mod lifecycle;
pub mod notice;
pub mod preferences;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use archive::AlertArchive;
pub use bookmarks::BookmarkTracker;
pub use error::{Result, SyncError};
pub use feed::ArticleStore;
pub use filter::{CategoryFilter, FilterState};
pub use lifecycle::LoadState;
pub use notice::{Notice, NoticeSender};
pub use preferences::{PrefState, PreferenceController};
pub use session::{FeedEntry, SessionContext, SyncHub};
pub use traits::NewsGateway;
