//! Template rendering for stepwise documents.
//!
//! Templates are rendered with [Handlebars](https://handlebarsjs.com/) via
//! [`renderer::IncrementalRenderer`], which runs one evaluation session per
//! render and exposes it to the template as a helper. The built-in demo
//! template is embedded at compile-time in [`embedded`].
//!
//! ## Referencing values
//!
//! - `{{_ "a"}}`: current value of `a` at this point of the document
//! - `{{title}}`: ordinary Handlebars variable from the render data
//!
//! Each `{{_ ...}}` occurrence is one request to the executor, so the helper
//! must not appear inside `{{#each}}` loops, partials or conditionals: the
//! executor relies on one evaluation per occurrence, in source order.

pub mod embedded;
pub mod helper;
pub mod renderer;
