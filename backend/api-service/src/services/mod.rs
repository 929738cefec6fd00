/// Business logic layer
///
/// Services own the rules (ownership, payer checks, tier arithmetic); the
/// `db` modules only run queries and handlers only translate HTTP.
pub mod auth;
pub mod categories;
pub mod messages;
pub mod oauth;
pub mod payments;
pub mod posts;
pub mod uploads;
pub mod users;

pub use auth::AuthService;
pub use categories::CategoryService;
pub use messages::MessageService;
pub use oauth::{OAuthClient, OAuthProfile};
pub use payments::PaymentService;
pub use posts::PostService;
pub use uploads::UploadService;
pub use users::UserService;
