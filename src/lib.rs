pub mod configuration;
pub mod error_handling;
pub mod inspection;
pub mod logger;
pub mod network;
pub mod relay;
pub mod session_management;
