//! Inbox Agent: answers email threads with a tool-using language model.

pub mod agent;
pub mod app;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod mailbox;
pub mod pipeline;
pub mod safety;
pub mod tools;
pub mod webhook;
