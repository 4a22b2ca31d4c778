use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::debug;

use spangate_validate::{TaskResolution, WorkflowLookup};

/// Resolves task ids against BPMN workflow definition files. Parsed files
/// are cached per instance behind an `RwLock`, so one index can serve many
/// concurrent validations over the same definitions.
///
/// The extraction is a lightweight scan rather than a full XML parse: it
/// collects the `id` attribute of every task-like element
/// (`serviceTask`, `userTask`, `scriptTask`, ..., `callActivity`).
#[derive(Default)]
pub struct BpmnFileIndex {
    cache: RwLock<HashMap<String, Arc<BTreeSet<String>>>>,
}

impl BpmnFileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn task_ids(&self, path: &str) -> Result<Arc<BTreeSet<String>>> {
        if let Some(hit) = self.cache.read().unwrap().get(path) {
            return Ok(hit.clone());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read workflow definition: {path}"))?;
        let ids = Arc::new(declared_task_ids(&content));
        debug!(workflow = path, tasks = ids.len(), "indexed workflow definition");
        self.cache
            .write()
            .unwrap()
            .insert(path.to_string(), ids.clone());
        Ok(ids)
    }
}

impl WorkflowLookup for BpmnFileIndex {
    fn resolve_task(&self, workflow_file: &str, task_id: &str) -> Result<TaskResolution> {
        let ids = self.task_ids(workflow_file)?;
        if ids.contains(task_id) {
            Ok(TaskResolution {
                found: true,
                reason: "declared in workflow".to_string(),
            })
        } else {
            Ok(TaskResolution {
                found: false,
                reason: format!(
                    "task '{}' not declared; workflow declares {} task element(s)",
                    task_id,
                    ids.len()
                ),
            })
        }
    }
}

/// Ids of all task-like elements in a BPMN document.
fn declared_task_ids(content: &str) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for chunk in content.split('<').skip(1) {
        let Some(tag) = chunk.split('>').next() else {
            continue;
        };
        let Some(name) = tag.split_whitespace().next() else {
            continue;
        };
        let local = name.rsplit(':').next().unwrap_or(name).to_ascii_lowercase();
        if !(local.ends_with("task") || local == "callactivity") {
            continue;
        }
        if let Some(id) = attr_value(tag, "id") {
            ids.insert(id);
        }
    }
    ids
}

fn attr_value(tag: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=\"");
    let mut rest = tag;
    while let Some(pos) = rest.find(&needle) {
        let preceded_ok = rest[..pos].ends_with(|c: char| c.is_whitespace());
        let after = &rest[pos + needle.len()..];
        if preceded_ok {
            return after.split('"').next().map(str::to_string);
        }
        rest = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="Process_1" isExecutable="true">
    <bpmn:startEvent id="Start_1"/>
    <bpmn:serviceTask id="Task_generate" name="Generate models"/>
    <bpmn:userTask id="Task_review" name="Review output"/>
    <bpmn:callActivity id="Call_validate" calledElement="Validation"/>
    <bpmn:endEvent id="End_1"/>
  </bpmn:process>
</bpmn:definitions>
"#;

    #[test]
    fn extracts_task_like_ids_only() {
        let ids = declared_task_ids(SAMPLE);
        assert!(ids.contains("Task_generate"));
        assert!(ids.contains("Task_review"));
        assert!(ids.contains("Call_validate"));
        assert!(!ids.contains("Process_1"));
        assert!(!ids.contains("Start_1"));
    }

    #[test]
    fn resolves_against_a_real_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.bpmn");
        std::fs::write(&path, SAMPLE).unwrap();
        let path = path.to_str().unwrap();

        let index = BpmnFileIndex::new();
        assert!(index.resolve_task(path, "Task_generate").unwrap().found);
        let miss = index.resolve_task(path, "Task_missing").unwrap();
        assert!(!miss.found);
        assert!(miss.reason.contains("Task_missing"));
    }

    #[test]
    fn caches_parsed_definitions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.bpmn");
        std::fs::write(&path, SAMPLE).unwrap();
        let path_str = path.to_str().unwrap();

        let index = BpmnFileIndex::new();
        assert!(index.resolve_task(path_str, "Task_review").unwrap().found);

        // Second lookup is served from cache even after the file is gone.
        std::fs::remove_file(&path).unwrap();
        assert!(index.resolve_task(path_str, "Task_review").unwrap().found);
    }

    #[test]
    fn unreadable_workflow_is_an_error() {
        assert!(BpmnFileIndex::new()
            .resolve_task("/no/such/flow.bpmn", "Task_1")
            .is_err());
    }
}
