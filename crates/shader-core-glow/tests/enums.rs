use shader_core::{AttachmentFormat, AttachmentPoint, FramebufferLayout, AttachmentDescriptor, StageKind};
use shader_core_glow::{attachment_enum, internal_format, shader_type};
use std::collections::BTreeSet;

#[test]
fn test_every_stage_has_its_own_shader_type() {
    let types: BTreeSet<u32> = StageKind::ALL.into_iter().map(shader_type).collect();
    assert_eq!(types.len(), StageKind::ALL.len());
    assert_eq!(shader_type(StageKind::Fragment), glow::FRAGMENT_SHADER);
    assert_eq!(shader_type(StageKind::TessEval), glow::TESS_EVALUATION_SHADER);
}

#[test]
fn test_layout_points_map_to_gl_attachments() {
    let layout = FramebufferLayout::new()
        .attach(AttachmentDescriptor::texture(AttachmentFormat::Rgba16F, 64, 64))
        .and_then(|l| l.attach(AttachmentDescriptor::renderbuffer(AttachmentFormat::Depth24Stencil8, 64, 64)))
        .and_then(|l| l.attach(AttachmentDescriptor::texture(AttachmentFormat::Rgba8, 64, 64)))
        .unwrap();

    let targets: Vec<u32> = (0..layout.len())
        .filter_map(|i| layout.attachment_point(i))
        .map(attachment_enum)
        .collect();
    assert_eq!(
        targets,
        vec![
            glow::COLOR_ATTACHMENT0,
            glow::DEPTH_STENCIL_ATTACHMENT,
            glow::COLOR_ATTACHMENT1
        ]
    );
    assert_eq!(attachment_enum(AttachmentPoint::Depth), glow::DEPTH_ATTACHMENT);
    assert_eq!(internal_format(AttachmentFormat::Depth24Stencil8), glow::DEPTH24_STENCIL8);
    assert_eq!(internal_format(AttachmentFormat::Rgba8), glow::RGBA8);
}
