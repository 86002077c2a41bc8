pub mod common;
pub mod export;
pub mod history;
pub mod image2text;
pub mod process;
