//! Core library for stepwise: incremental evaluation of code blocks in templates.
//!
//! A stepwise document is markdown with Handlebars references (`{{_ "a"}}`)
//! interleaved with fenced code blocks (```` ```calc ````). Rendering it gives
//! each reference the value `a` has *at that point of the text*: blocks run
//! lazily, just before the first reference that follows them.
//!
//! - [`segment`] splits the text into prose and code blocks and counts the
//!   references in front of each block
//! - [`executor::Executor`] serves value requests and runs blocks once the
//!   request count passes their threshold
//! - [`namespace::Namespace`] holds the values the blocks assign
//! - [`script`] is the restricted language the blocks are written in
//! - [`templates`] wires the executor into Handlebars

pub mod config;
pub mod error;
pub mod executor;
pub mod namespace;
pub mod script;
pub mod segment;
pub mod templates;
