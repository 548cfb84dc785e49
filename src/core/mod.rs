pub mod config;
pub mod endpoint;
pub mod llm;
pub mod registration;
pub mod terminal;
pub mod vault;

#[cfg(test)]
pub mod testing;
