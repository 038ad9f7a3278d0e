//! Unit tests for the Vulkan backend configuration and message filtering
//!
//! No GPU required.

use super::*;
use laugh_engine::laugh::RendererConfig;

// ============================================================================
// SEVERITY FILTER TESTS
// ============================================================================

#[test]
fn test_errors_only_rejects_warnings() {
    let severity = DebugSeverity::ErrorsOnly;
    assert!(severity.accepts(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
    assert!(!severity.accepts(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
}

#[test]
fn test_errors_and_warnings_mask() {
    let mask = DebugSeverity::ErrorsAndWarnings.to_vk();
    assert!(mask.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!mask.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
}

#[test]
fn test_all_accepts_verbose() {
    assert!(DebugSeverity::All.accepts(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

#[test]
fn test_labels() {
    assert_eq!(severity_label(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING).0, "WARNING");
    assert_eq!(type_label(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
    assert_eq!(type_label(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}

// ============================================================================
// CONFIG TESTS
// ============================================================================

#[test]
fn test_config_from_renderer_config() {
    let mut renderer_config = RendererConfig::default();
    renderer_config.app_name = "Viewer".to_string();
    renderer_config.enable_validation = true;

    let config = VulkanConfig::from_renderer_config(&renderer_config);
    assert_eq!(config.app_name, "Viewer");
    assert!(config.enable_validation);
    assert_eq!(config.debug_severity, DebugSeverity::ErrorsAndWarnings);
    assert_eq!(config.validation_active(), cfg!(feature = "vulkan-validation"));
}

#[test]
fn test_validation_inactive_when_disabled() {
    let config = VulkanConfig { enable_validation: false, ..VulkanConfig::default() };
    assert!(!config.validation_active());
}

#[test]
fn test_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
}
