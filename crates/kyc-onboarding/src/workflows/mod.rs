pub mod notifications;
pub mod verification;
