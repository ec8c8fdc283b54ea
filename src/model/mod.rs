pub mod config;
pub mod note;
pub mod token;
pub mod vocabulary;
