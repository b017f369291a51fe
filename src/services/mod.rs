pub mod capture_service;
pub mod hosts;
pub mod settings_service;
pub mod upload_service;
