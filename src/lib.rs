#![forbid(unsafe_code)]

pub mod action;
pub mod book;
pub mod book_file;
pub mod cli;
pub mod lock;
pub mod logging;
pub mod platform;
pub mod run;
pub mod text;
