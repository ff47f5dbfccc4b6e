pub mod bus;
pub mod companion;
pub mod config;
pub mod database;
pub mod http_client;
pub mod llm_client;
pub mod mood;
pub mod response;
pub mod runtime;
pub mod session;
pub mod theme;
