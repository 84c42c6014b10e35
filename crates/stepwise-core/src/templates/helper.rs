//! The Handlebars helper that turns each `{{_ "name"}}` into an executor request.

use std::sync::{Arc, Mutex};

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderErrorReason,
};

use crate::error::StepwiseError;
use crate::executor::Executor;

/// Executor state shared between the helper and the renderer that owns it.
///
/// `failure` keeps the typed error of a failed request; Handlebars only
/// carries a message, so the renderer returns this one instead.
pub struct SharedSession {
    pub executor: Executor,
    pub failure: Option<StepwiseError>,
}

impl SharedSession {
    pub fn new(executor: Executor) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            executor,
            failure: None,
        }))
    }
}

/// Serves `{{<helper> "name"}}` by calling [`Executor::request_text`] once per
/// occurrence and writing the result unescaped.
///
/// The name is normally a string literal. A bare path (`{{_ a}}`) names the
/// value by its path text, even where the data context also defines that path.
/// Strict mode rejects a bare path the data context does not define.
pub struct RequestHelper {
    session: Arc<Mutex<SharedSession>>,
}

impl RequestHelper {
    pub fn new(session: Arc<Mutex<SharedSession>>) -> Self {
        Self { session }
    }
}

impl HelperDef for RequestHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let param = h.param(0).ok_or_else(|| {
            RenderErrorReason::Other(format!("helper '{}' needs a name argument", h.name()))
        })?;
        let name = match (param.relative_path(), param.value().as_str()) {
            (Some(path), _) => path.to_string(),
            (None, Some(literal)) => literal.to_string(),
            (None, None) => {
                return Err(RenderErrorReason::Other(format!(
                    "helper '{}' expects a name, got {}",
                    h.name(),
                    param.value()
                ))
                .into())
            }
        };

        let mut session = self
            .session
            .lock()
            .map_err(|_| RenderErrorReason::Other("evaluation session poisoned".into()))?;
        match session.executor.request_text(&name) {
            Ok(text) => {
                out.write(&text)?;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                session.failure = Some(err);
                Err(RenderErrorReason::Other(message).into())
            }
        }
    }
}
