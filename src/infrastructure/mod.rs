pub mod axum_http;
pub mod muck;
pub mod payments;
pub mod postgres;
