//! logchat is a terminal client for a chatbot that analyses CI build logs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] talks to the chatbot server and normalizes its response shapes
//!   and failures.
//! - [`core`] owns the conversation (with its two-phase optimistic send), the
//!   sidebar list and search, configuration, and the [`core::app::App`] state
//!   that ties them together.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`utils`] holds transcript and diagnostic logging plus URL helpers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches one-shot commands or starts
//! [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
