//! Assertion helpers with diagnostic output.
//!
//! Every failure names the feature, what was expected and what was found,
//! plus the engine errors and warnings of the last rebuild.

use weld_engine::EngineError;
use weld_kernel::{KernelIntrospect, MockKernel};

use crate::helpers::HarnessError;
use crate::workflow::WeldBench;

/// Assert that a session holds no scratch sketches.
pub fn assert_no_scratch(kernel: &MockKernel, ctx: &str) -> Result<(), HarnessError> {
    let live = kernel.live_sketch_count();
    if live == 0 {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] {live} scratch sketches left in the session"),
        })
    }
}

/// Assert the number of live solids in a session.
pub fn assert_solid_count(kernel: &MockKernel, expected: usize, ctx: &str) -> Result<(), HarnessError> {
    let actual = kernel.solids().len();
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected {expected} solids, got {actual}"),
        })
    }
}

impl WeldBench {
    fn context(&self) -> String {
        let errors: Vec<String> = self
            .engine
            .errors
            .iter()
            .map(|(id, e)| format!("{}: {e}", self.feature_name(*id).unwrap_or("?")))
            .collect();
        format!(
            "errors: [{}], warnings: [{}]",
            errors.join("; "),
            self.engine.warnings.join("; ")
        )
    }

    /// Assert the last rebuild recorded no feature errors.
    pub fn assert_no_errors(&self) -> Result<(), HarnessError> {
        if self.engine.errors.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("expected no errors, {}", self.context()),
            })
        }
    }

    /// Assert a feature produced exactly these body names.
    pub fn assert_body_names(&self, name: &str, expected: &[&str]) -> Result<(), HarnessError> {
        let actual = self.body_names(name)?;
        if actual.iter().map(String::as_str).eq(expected.iter().copied()) {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{name}] expected bodies {expected:?}, got {actual:?} ({})",
                    self.context()
                ),
            })
        }
    }

    /// Assert how many bodies a feature produced.
    pub fn assert_body_count(&self, name: &str, expected: usize) -> Result<(), HarnessError> {
        let actual = self.result(name)?.bodies.len();
        if actual == expected {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("[{name}] expected {expected} bodies, got {actual}"),
            })
        }
    }

    /// Assert a feature failed validation naming exactly `parameters`.
    pub fn assert_invalid(&self, name: &str, parameters: &[&str]) -> Result<(), HarnessError> {
        match self.error(name)? {
            Some(e @ EngineError::Validation(_))
                if e.parameters().iter().map(String::as_str).eq(parameters.iter().copied()) =>
            {
                Ok(())
            }
            other => Err(HarnessError::AssertionFailed {
                detail: format!("[{name}] expected validation of {parameters:?}, got {other:?}"),
            }),
        }
    }

    /// Assert a feature ran but produced no weld at all.
    pub fn assert_weld_failed(&self, name: &str) -> Result<(), HarnessError> {
        match self.error(name)? {
            Some(EngineError::WeldFailed { .. }) => Ok(()),
            other => Err(HarnessError::AssertionFailed {
                detail: format!("[{name}] expected \"weld failed\", got {other:?}"),
            }),
        }
    }

    /// Assert some diagnostic of a feature mentions `needle`, whether the
    /// feature succeeded or failed.
    pub fn assert_diagnostic(&self, name: &str, needle: &str) -> Result<(), HarnessError> {
        let found = match self.error(name)? {
            Some(EngineError::WeldFailed { diagnostics }) => diagnostics.mentions(needle),
            _ => self
                .result(name)
                .map(|r| r.diagnostics.mentions(needle))
                .unwrap_or(false),
        };
        if found {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("[{name}] no diagnostic mentions {needle:?} ({})", self.context()),
            })
        }
    }
}
