//! Client-side half of the workspace synchronization core.
//!
//! The virtual tree mirrors the store, the editor state holds buffers and
//! tabs, the synchronization engine turns mutations into store calls, and
//! the team channel carries chat and typing presence. Everything here talks
//! to the server only through the [`api::WorkspaceBackend`] seam and the
//! channel connection.

pub mod api;
pub mod channel;
pub mod editor;
pub mod engine;
pub mod tree;
