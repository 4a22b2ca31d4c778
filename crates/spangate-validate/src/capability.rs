//! Injected capability contracts for the strict validator. The validators
//! never touch the filesystem or ambient state directly; verification of
//! external claims goes through these traits so callers control caching,
//! timeouts, and test doubles.

use anyhow::Result;

/// Answers whether a claimed file path exists. An `Err` means the check
/// itself failed (I/O error), which the strict validator treats as an
/// unverifiable claim, not as "absent".
pub trait FileCheck: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskResolution {
    pub found: bool,
    pub reason: String,
}

/// Resolves a task id against an external workflow definition file.
pub trait WorkflowLookup: Send + Sync {
    fn resolve_task(&self, workflow_file: &str, task_id: &str) -> Result<TaskResolution>;
}

/// Capability bundle that refuses everything. Useful for callers that want
/// the strict validator's structural and contradiction checks without any
/// filesystem access; every attribution claim then reads as unverifiable.
pub struct NoVerification;

impl FileCheck for NoVerification {
    fn exists(&self, _path: &str) -> Result<bool> {
        Err(anyhow::anyhow!("file verification disabled"))
    }
}

impl WorkflowLookup for NoVerification {
    fn resolve_task(&self, _workflow_file: &str, _task_id: &str) -> Result<TaskResolution> {
        Err(anyhow::anyhow!("workflow verification disabled"))
    }
}
