pub mod api_errors;
pub mod healthpay;
pub mod http;
