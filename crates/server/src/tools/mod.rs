//! MCP tool implementations.
//!
//! This module contains all tools exposed by the subdx server.

pub mod subtitle_fetch;
pub mod subtitles_search;
