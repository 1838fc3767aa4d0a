pub mod runner;
pub mod tools;

pub use tools::{ensure_tools, run_intrusive, INTRUSIVE_TOOLS};
