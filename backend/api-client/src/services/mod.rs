//! Typed wrappers for each API area
//!
//! Services are cheap handles over the shared [`HttpClient`](crate::HttpClient);
//! build them through [`ApiClient`](crate::ApiClient).

mod auth;
mod categories;
mod messages;
mod payments;
mod posts;
mod uploads;
mod users;

pub use auth::AuthApi;
pub use categories::CategoriesApi;
pub use messages::MessagesApi;
pub use payments::{PaymentsApi, COMPANION_KEY_HEADER};
pub use posts::PostsApi;
pub use uploads::UploadsApi;
pub use users::UsersApi;
