//! Vision-capable chat completion client and recipe prompt loading.

pub mod openai;
pub mod prompt;
