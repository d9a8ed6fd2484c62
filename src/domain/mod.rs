pub mod analysis;
pub mod error;
pub mod llm_config;
pub mod notification;
pub mod project;
pub mod scenario;
pub mod source;
