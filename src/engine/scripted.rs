//! A deterministic, queue-driven estimation engine.
//!
//! Useful for integration bring-up and for exercising the control layer in
//! tests: each call to `process_frame` pops the next scripted result. When
//! the script runs dry the engine keeps answering with a configurable
//! fallback (by default: tracking lost).

use std::collections::VecDeque;

use crate::frame::Frame;

use super::{EngineContext, EngineResult, EngineStatus, EstimationEngine};

pub struct ScriptedEngine {
    script: VecDeque<EngineResult>,
    fallback: EngineResult,
    /// Contexts observed so far, in call order.
    pub observed: Vec<EngineContext>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            fallback: EngineResult::with_status(EngineStatus::TrackingLost),
            observed: Vec::new(),
        }
    }

    /// Queue a result for the next unconsumed frame.
    pub fn push(&mut self, result: EngineResult) -> &mut Self {
        self.script.push_back(result);
        self
    }

    /// Queue `n` copies of the same result.
    pub fn push_repeated(&mut self, result: EngineResult, n: usize) -> &mut Self {
        for _ in 0..n {
            self.script.push_back(result.clone());
        }
        self
    }

    pub fn set_fallback(&mut self, result: EngineResult) {
        self.fallback = result;
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimationEngine for ScriptedEngine {
    fn process_frame(&mut self, _frame: &Frame, ctx: &EngineContext) -> EngineResult {
        self.observed.push(*ctx);
        self.script.pop_front().unwrap_or_else(|| self.fallback.clone())
    }

    fn reset(&mut self) {
        self.script.clear();
        self.observed.clear();
    }
}
