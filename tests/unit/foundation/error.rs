use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CompositorError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        CompositorError::graph("x")
            .to_string()
            .contains("graph error:")
    );
    assert!(
        CompositorError::execution("x")
            .to_string()
            .contains("execution error:")
    );
    assert!(
        CompositorError::scheduler("x")
            .to_string()
            .contains("scheduler error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CompositorError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
