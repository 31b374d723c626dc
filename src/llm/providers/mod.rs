pub mod anthropic;
pub mod deepseek;
