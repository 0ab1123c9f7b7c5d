pub mod json;
pub mod swift;
