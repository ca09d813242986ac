//! lectern - asynchronous study-material pipeline.
//!
//! Turns lecture videos and uploaded files into transcripts, summaries,
//! quizzes and flashcard decks using a pool of queue-driven workers.

#![allow(clippy::should_implement_trait)]

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod http_client;
pub mod llm;
pub mod lock;
pub mod models;
pub mod queue;
pub mod rate_limit;
pub mod repository;
pub mod retry;
pub mod schema;
pub mod status;
pub mod worker;
