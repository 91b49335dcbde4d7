pub mod auth_service;
pub mod catalog_service;
pub mod dashboard_service;
pub mod order_service;
pub mod user_service;
