/// Database access layer
///
/// Schema lives in `migrations/`, embedded at compile time and applied on
/// startup through [`MIGRATOR`].
pub mod categories;
pub mod likes;
pub mod messages;
pub mod payments;
pub mod posts;
pub mod users;

pub use likes::LikeRepository;

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
