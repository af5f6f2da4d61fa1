pub mod auth;
pub mod classes;
pub mod email;
pub mod guardians;
pub mod metrics;
pub mod users;
