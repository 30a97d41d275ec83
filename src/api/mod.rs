pub mod models;
pub mod slides;
