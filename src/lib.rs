//! # comment-board
//!
//! Client-side controller for a board of dated comments kept in named
//! buckets on a remote document store.
//!
//! The crate holds the controller (`controller`), the UI state it drives
//! (`state`), the store seam with its HTTP implementation (`store`) and
//! connection settings (`config`). Rendering is left to whoever embeds it.

pub mod config;
pub mod controller;
pub mod state;
pub mod store;

pub use controller::CommentBoardController;
