use super::*;

#[test]
fn test_stage_path_layout() {
    let path = stage_path(Path::new("shaders"), "sprite", "frag");
    assert_eq!(path, Path::new("shaders").join("sprite.frag.spv"));
}

#[test]
fn test_spirv_words_little_endian() {
    let bytes = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
    let words = spirv_words(&bytes).unwrap();
    assert_eq!(words, vec![0x0723_0203, 0x0001_0000]);
}

#[test]
fn test_spirv_words_rejects_unaligned() {
    assert!(spirv_words(&[0x03, 0x02, 0x23]).is_err());
    assert!(spirv_words(&[]).is_err());
}

#[test]
fn test_reflection_rejects_garbage() {
    assert!(reflect_push_constant_size(&[0xdead_beef, 0, 0, 0, 0]).is_err());
}

#[test]
fn test_stage_flags() {
    let flags = stage_flags(ShaderStages::VERTEX | ShaderStages::FRAGMENT);
    assert_eq!(flags, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT);
    assert_eq!(stage_flags(ShaderStages::GEOMETRY), vk::ShaderStageFlags::GEOMETRY);
}
