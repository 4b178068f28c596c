use docflow_core::{validation_codes, Pipeline, PipelineError, SocketType};
use docflow_test_utils::{ConstantSource, Passthrough, Sum, ThresholdLoop, ThresholdRouter};
use pretty_assertions::assert_eq;

fn three_passthroughs() -> Pipeline {
    let mut pipeline = Pipeline::new();
    for name in ["a", "b", "c"] {
        pipeline.add_component(name, Passthrough::new(SocketType::Number)).unwrap();
    }
    pipeline
}

#[test]
fn test_single_producer_regardless_of_order() {
    for (first, second) in [("a", "b"), ("b", "a")] {
        let mut pipeline = three_passthroughs();
        pipeline.connect(first, "c").unwrap();
        let err = pipeline.connect(second, "c").unwrap_err();
        assert_eq!(err.error_code(), validation_codes::SOCKET_OCCUPIED);
        assert_eq!(pipeline.connections().len(), 1);
    }
}

#[test]
fn test_failed_connect_leaves_graph_untouched() {
    let mut pipeline = Pipeline::new();
    pipeline.add_component("text", ConstantSource::text("x")).unwrap();
    pipeline.add_component("sum", Sum::new()).unwrap();

    let err = pipeline.connect("text", "sum").unwrap_err();
    assert_eq!(
        err,
        PipelineError::TypeMismatch {
            sender: "text.value".to_string(),
            receiver: "sum.values".to_string(),
            sender_type: "String".to_string(),
            receiver_type: "Number".to_string(),
        }
    );
    assert!(pipeline.connections().is_empty());
}

#[test]
fn test_any_accepts_everything() {
    let mut pipeline = Pipeline::new();
    pipeline.add_component("text", ConstantSource::text("x")).unwrap();
    pipeline.add_component("sink", Passthrough::any()).unwrap();
    pipeline.connect("text", "sink").unwrap();
}

#[test]
fn test_router_requires_explicit_socket() {
    let mut pipeline = Pipeline::new();
    pipeline.add_component("router", ThresholdRouter::new(1.0)).unwrap();
    pipeline.add_component("sink", Passthrough::new(SocketType::Number)).unwrap();

    let err = pipeline.connect("router", "sink").unwrap_err();
    assert_eq!(err.error_code(), validation_codes::AMBIGUOUS_SOCKET);
    pipeline.connect("router.high", "sink.value").unwrap();
}

#[test]
fn test_validation_enumerates_all_issues() {
    let mut pipeline = three_passthroughs();
    pipeline.add_component("loop", ThresholdLoop::new(3.0)).unwrap();
    pipeline.connect("a", "b").unwrap();
    pipeline.connect("b", "a").unwrap();
    pipeline.connect_loop("loop.again", "c").unwrap();

    let err = pipeline.validate().unwrap_err();
    let codes: Vec<_> = err.issues().iter().map(|issue| issue.code).collect();
    assert_eq!(
        codes,
        vec![
            validation_codes::CIRCULAR_DEPENDENCY,
            validation_codes::LOOP_NOT_CLOSED
        ]
    );

    let rendered = err.to_string();
    assert!(rendered.contains("a → b → a"));
}

#[test]
fn test_self_loop_is_structurally_valid() {
    let mut pipeline = Pipeline::new();
    pipeline.add_component("loop", ThresholdLoop::new(3.0)).unwrap();
    pipeline.connect_loop("loop.again", "loop.value").unwrap();
    assert!(pipeline.validate().is_ok());
}

#[test]
fn test_undeclared_self_edge_is_a_cycle() {
    let mut pipeline = Pipeline::new();
    pipeline.add_component("loop", ThresholdLoop::new(3.0)).unwrap();
    pipeline.connect("loop.again", "loop.value").unwrap();
    let err = pipeline.validate().unwrap_err();
    assert_eq!(err.issues()[0].code, validation_codes::CIRCULAR_DEPENDENCY);
}
