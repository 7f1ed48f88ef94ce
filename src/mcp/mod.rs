pub mod handlers;
pub mod output;
pub mod stdio;
pub mod tooling;

pub use output::OutputQueue;
