use serde_json::json;
use tempfile::tempdir;

use spangate_core::{SpanId, SpanRecord, TraceId};
use spangate_lookup::{BpmnFileIndex, FsFileCheck};
use spangate_validate::{DodValidator, LieKind};

const WORKFLOW: &str = r#"<?xml version="1.0"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
  <bpmn:process id="Process_1">
    <bpmn:serviceTask id="Task_generate" name="Generate"/>
    <bpmn:serviceTask id="Task_validate" name="Validate"/>
  </bpmn:process>
</bpmn:definitions>
"#;

fn span_for(id: &str, code_path: &str, workflow: &str, task: &str) -> SpanRecord {
    let mut span = SpanRecord::named("bpmn.service.generate_models");
    span.span_id = SpanId::from_str(id);
    span.trace_id = TraceId::from_str("trace-1");
    span.duration_ns = Some(2_000_000);
    span.attributes.insert("bpmn.task.type", json!("service"));
    span.attributes.insert("bpmn.workflow.file", json!(workflow));
    span.attributes.insert("bpmn.task.id", json!(task));
    span.attributes.insert("code.filepath", json!(code_path));
    span.attributes.insert("code.lineno", json!(17));
    span.attributes.insert("execution.timestamp", json!(1_700_000_000));
    span
}

#[test]
fn fully_verified_batch_is_done() {
    let dir = tempdir().unwrap();
    let code = dir.path().join("generator.py");
    std::fs::write(&code, "def generate(): pass\n").unwrap();
    let flow = dir.path().join("flow.bpmn");
    std::fs::write(&flow, WORKFLOW).unwrap();

    let spans: Vec<SpanRecord> = (0..10)
        .map(|i| {
            span_for(
                &format!("s{i}"),
                code.to_str().unwrap(),
                flow.to_str().unwrap(),
                "Task_generate",
            )
        })
        .collect();

    let validator = DodValidator::new(Box::new(FsFileCheck), Box::new(BpmnFileIndex::new()));
    let report = validator.validate(&spans);

    assert!(report.lies_detected.is_empty(), "{:?}", report.lies_detected);
    assert!(!report.has_critical());
    assert!(report.trust_score >= 0.95);
    assert!(report.is_done);
}

#[test]
fn nonexistent_code_path_is_a_fake_file_lie() {
    let dir = tempdir().unwrap();
    let flow = dir.path().join("flow.bpmn");
    std::fs::write(&flow, WORKFLOW).unwrap();

    let span = span_for(
        "s1",
        dir.path().join("gone.py").to_str().unwrap(),
        flow.to_str().unwrap(),
        "Task_generate",
    );

    let validator = DodValidator::new(Box::new(FsFileCheck), Box::new(BpmnFileIndex::new()));
    let report = validator.validate(&[span]);

    assert_eq!(report.lies_detected.len(), 1);
    assert_eq!(report.lies_detected[0].kind, LieKind::FakeFile);
    assert!(report.has_critical());
    assert!(!report.is_done);
}

#[test]
fn undeclared_task_id_is_a_fake_task_lie() {
    let dir = tempdir().unwrap();
    let code = dir.path().join("generator.py");
    std::fs::write(&code, "pass\n").unwrap();
    let flow = dir.path().join("flow.bpmn");
    std::fs::write(&flow, WORKFLOW).unwrap();

    let span = span_for(
        "s1",
        code.to_str().unwrap(),
        flow.to_str().unwrap(),
        "Task_invented",
    );

    let validator = DodValidator::new(Box::new(FsFileCheck), Box::new(BpmnFileIndex::new()));
    let report = validator.validate(&[span]);

    assert_eq!(report.lies_detected.len(), 1);
    assert_eq!(report.lies_detected[0].kind, LieKind::FakeTask);
    assert!(!report.is_done);
}
