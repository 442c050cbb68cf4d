pub mod check;
pub mod completions;
pub mod convert;
pub mod is_a;
pub mod links;
pub mod patch;
pub mod sanitize;
pub mod show;
pub mod types;
