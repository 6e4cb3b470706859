pub mod bridge;
pub mod prompt;
pub mod sync;
