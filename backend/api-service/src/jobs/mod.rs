/// Background jobs spawned by `main`
pub mod payment_expiry;

pub use payment_expiry::start_payment_expiry;
