pub mod scanner;
pub mod tooltip;
