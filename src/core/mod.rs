pub mod slides;
pub mod video;
pub mod youtube;
