use super::*;

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_default_config_is_valid() {
    let config = RendererConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.frame_count, 2);
    assert_eq!(config.image_count, 3);
    assert_eq!(config.max_materials, 256);
}

#[test]
fn test_budgets() {
    assert_eq!(SCENE_UNIFORM_BUDGET, 256);
    assert_eq!(MATERIAL_UNIFORM_BUDGET, 256);
    assert_eq!(MODEL_UNIFORM_BUDGET, 128);
    assert_eq!(MAX_LIGHTS, 3);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_zero_frame_count_rejected() {
    let config = RendererConfig { frame_count: 0, ..Default::default() };
    match config.validate() {
        Err(Error::InitializationFailed(msg)) => assert!(msg.contains("frame_count")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_zero_vertex_space_rejected() {
    let config = RendererConfig { vertex_space: 0, ..Default::default() };
    assert!(config.validate().is_err());
}

#[test]
fn test_too_many_materials_rejected() {
    let config = RendererConfig { max_materials: 70_000, ..Default::default() };
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_fence_timeout_rejected() {
    let config = RendererConfig { fence_timeout: Duration::ZERO, ..Default::default() };
    assert!(config.validate().is_err());
}

#[test]
fn test_fence_timeout_ns() {
    let config = RendererConfig { fence_timeout: Duration::from_millis(100), ..Default::default() };
    assert_eq!(config.fence_timeout_ns(), 100_000_000);
}
