pub mod account_service;
pub mod bucket_service;
pub mod session_service;
