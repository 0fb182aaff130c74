pub mod artifacts;
pub mod error;
pub mod mp3;
pub mod registry;
pub mod retention;
