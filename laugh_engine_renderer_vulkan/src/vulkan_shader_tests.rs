//! Unit tests for SPIR-V word conversion and reflection errors
//!
//! No GPU required.

use super::*;

// ============================================================================
// SPIR-V WORDS
// ============================================================================

#[test]
fn test_spirv_words_little_endian() {
    let bytes = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
    let words = spirv_words("magic", &bytes).unwrap();
    assert_eq!(words, vec![0x0723_0203, 0x0001_0000]);
}

#[test]
fn test_spirv_words_rejects_unaligned_size() {
    let result = spirv_words("broken", &[0x03, 0x02, 0x23]);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_spirv_words_rejects_empty_code() {
    assert!(spirv_words("empty", &[]).is_err());
}

// ============================================================================
// REFLECTION
// ============================================================================

#[test]
fn test_reflection_rejects_garbage() {
    let words = vec![0xDEAD_BEEF; 8];
    assert!(reflect_interface("garbage", &words, "main").is_err());
}
