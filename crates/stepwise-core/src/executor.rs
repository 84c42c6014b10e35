//! The access-gated executor.
//!
//! A template renderer knows nothing about code blocks; it only asks for
//! values, one request per reference, in the order the references appear.
//! The executor counts those requests and uses the count to decide when each
//! code block runs: block *n* runs as soon as the counter exceeds the number
//! of references that precede it in the text. The counter is the only link
//! between the renderer and the blocks.
//!
//! ## Ordering contract
//!
//! The renderer must make one fresh, uncached request per reference, in
//! source order. A renderer that caches, reorders or repeats evaluations
//! (loops, partials, conditionals around references) silently shifts values
//! to the wrong positions. [`Executor::report`] exposes the request count so
//! callers can compare it with [`Executor::expected_requests`].

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::EvalConfig;
use crate::error::{Result, StepwiseError};
use crate::namespace::Namespace;
use crate::script::{ScriptEngine, ScriptError, Value};
use crate::segment::{CodeBlock, Segmentation, Segmenter};

/// Runs code-block source against the session namespace.
///
/// [`ScriptEngine`] is the default implementation.
pub trait BlockEngine: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Validate source without running it.
    fn check(&self, source: &str) -> std::result::Result<(), ScriptError>;

    /// Run source against the namespace. Statements run in order and may
    /// read or write any name.
    fn execute(
        &self,
        source: &str,
        namespace: &mut Namespace,
    ) -> std::result::Result<(), ScriptError>;
}

/// Answer to a single value request.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Defined(Value),
    /// No block has assigned the name yet.
    Undefined,
}

impl Lookup {
    /// Text for the template: the value, or `sentinel` when undefined.
    pub fn render(&self, sentinel: &str) -> String {
        match self {
            Lookup::Defined(value) => value.to_string(),
            Lookup::Undefined => sentinel.to_string(),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Lookup::Defined(_))
    }
}

/// Counters describing a session, for logging and ordering checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Requests served so far.
    pub requests: u64,
    /// References counted in the template text.
    pub expected_requests: u64,
    pub blocks_total: usize,
    pub blocks_executed: usize,
    /// Blocks still waiting for their threshold.
    pub blocks_pending: usize,
}

impl SessionReport {
    /// Whether the renderer made exactly as many requests as the text announced.
    pub fn is_consistent(&self) -> bool {
        self.requests == self.expected_requests
    }
}

/// One evaluation session over one template.
pub struct Executor {
    pending: VecDeque<CodeBlock>,
    namespace: Namespace,
    counter: u64,
    executed: usize,
    total_blocks: usize,
    expected_requests: u64,
    sentinel: String,
    aborted: bool,
    engine: Box<dyn BlockEngine>,
}

impl Executor {
    /// Segment `text` and start a session with the default [`ScriptEngine`].
    pub fn new(text: &str, config: &EvalConfig) -> Result<Self> {
        Self::with_engine(text, config, Box::new(ScriptEngine::new()))
    }

    /// Segment `text` and start a session running blocks with `engine`.
    pub fn with_engine(
        text: &str,
        config: &EvalConfig,
        engine: Box<dyn BlockEngine>,
    ) -> Result<Self> {
        let segmentation = Segmenter::from_config(config).segment(text)?;
        Ok(Self::from_segmentation(segmentation, config, engine))
    }

    /// Start a session from an existing segmentation.
    pub fn from_segmentation(
        segmentation: Segmentation,
        config: &EvalConfig,
        engine: Box<dyn BlockEngine>,
    ) -> Self {
        tracing::debug!(
            blocks = segmentation.blocks.len(),
            references = segmentation.total_references,
            engine = engine.name(),
            "started evaluation session"
        );
        Self {
            total_blocks: segmentation.blocks.len(),
            pending: segmentation.blocks,
            namespace: Namespace::new(),
            counter: 0,
            executed: 0,
            expected_requests: segmentation.total_references,
            sentinel: config.undefined.clone(),
            aborted: false,
            engine,
        }
    }

    /// Serve one value request.
    ///
    /// Increments the access counter, runs every pending block whose
    /// threshold the counter now exceeds (zero, one or several), then looks
    /// `name` up. A failing block aborts the session: its error is returned
    /// here and every later request fails with [`StepwiseError::SessionAborted`].
    pub fn request(&mut self, name: &str) -> Result<Lookup> {
        if self.aborted {
            return Err(StepwiseError::SessionAborted);
        }
        self.counter += 1;
        tracing::trace!(name, counter = self.counter, "value requested");

        while self
            .pending
            .front()
            .is_some_and(|block| self.counter > block.threshold)
        {
            let Some(block) = self.pending.pop_front() else {
                break;
            };
            self.run_block(block)?;
        }

        Ok(match self.namespace.get(name) {
            Some(value) => Lookup::Defined(value.clone()),
            None => Lookup::Undefined,
        })
    }

    /// [`request`](Self::request), rendered as template text.
    pub fn request_text(&mut self, name: &str) -> Result<String> {
        let lookup = self.request(name)?;
        Ok(lookup.render(self.sentinel()))
    }

    fn run_block(&mut self, block: CodeBlock) -> Result<()> {
        tracing::debug!(
            index = block.index,
            threshold = block.threshold,
            counter = self.counter,
            "executing code block"
        );
        self.executed += 1;
        self.engine
            .execute(&block.source(), &mut self.namespace)
            .map_err(|source| {
                self.aborted = true;
                StepwiseError::BlockExecution {
                    block: block.index,
                    line: block.fence_line,
                    source,
                }
            })
    }

    /// Validate every pending block without running any of them.
    pub fn check_blocks(&self) -> Result<()> {
        for block in &self.pending {
            self.engine
                .check(&block.source())
                .map_err(|source| StepwiseError::BlockExecution {
                    block: block.index,
                    line: block.fence_line,
                    source,
                })?;
        }
        Ok(())
    }

    /// Requests served so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Blocks still waiting, front first.
    pub fn pending(&self) -> impl Iterator<Item = &CodeBlock> {
        self.pending.iter()
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// References the segmenter counted in the template text.
    pub fn expected_requests(&self) -> u64 {
        self.expected_requests
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            requests: self.counter,
            expected_requests: self.expected_requests,
            blocks_total: self.total_blocks,
            blocks_executed: self.executed,
            blocks_pending: self.pending.len(),
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("engine", &self.engine.name())
            .field("counter", &self.counter)
            .field("pending", &self.pending.len())
            .field("namespace", &self.namespace)
            .field("aborted", &self.aborted)
            .finish()
    }
}
