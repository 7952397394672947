//! Command-line front end for the whisper-finetune data pipeline.

pub mod check;
pub mod cli;
pub mod collate;
pub mod config;
pub mod evaluate;
pub mod init;
pub mod prepare;
