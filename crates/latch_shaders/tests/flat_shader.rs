use latch_shaders::glam::{Mat3, Vec4};
use latch_shaders::{
    BackendTier, BindingState, Capability, FlatFlags, FlatShader2D, FlatShader3D, GpuError,
    MisuseKind, ShaderError, SoftwareConfig, SoftwareDevice, Violation,
};

fn misuse_messages<T>(results: impl IntoIterator<Item = Result<T, ShaderError>>) -> Vec<String> {
    results
        .into_iter()
        .filter_map(Result::err)
        .map(|err| err.to_string())
        .collect()
}

#[test]
fn construction_keeps_flags_and_draw_count() {
    let device = SoftwareDevice::default();
    let cases = [
        (FlatFlags::empty(), 1),
        (FlatFlags::TEXTURED, 1),
        (FlatFlags::TEXTURED | FlatFlags::ALPHA_MASK, 1),
        (FlatFlags::TEXTURED | FlatFlags::TEXTURE_TRANSFORMATION, 1),
        (FlatFlags::VERTEX_COLOR | FlatFlags::OBJECT_ID, 1),
        (FlatFlags::INSTANCED_OBJECT_ID | FlatFlags::INSTANCED_TRANSFORMATION, 1),
        (FlatFlags::TEXTURED | FlatFlags::INSTANCED_TEXTURE_OFFSET, 1),
        (FlatFlags::UNIFORM_BUFFERS, 1),
        (FlatFlags::UNIFORM_BUFFERS | FlatFlags::TEXTURED | FlatFlags::TEXTURE_TRANSFORMATION, 63),
        (FlatFlags::MULTI_DRAW | FlatFlags::OBJECT_ID, 128),
    ];

    for (flags, draw_count) in cases {
        let shader = FlatShader2D::with_draw_count(device.clone(), flags, draw_count).unwrap();
        assert_eq!(shader.flags(), flags);
        assert_eq!(shader.draw_count(), draw_count);
        assert!(shader.id().is_some());
        assert_eq!(shader.state(), BindingState::Unbound);

        let shader = FlatShader3D::with_draw_count(device.clone(), flags, draw_count).unwrap();
        assert_eq!(shader.flags(), flags);
        assert_eq!(shader.draw_count(), draw_count);
    }
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn texture_transformation_requires_texturing() {
    let device = SoftwareDevice::default();
    let err = FlatShader2D::new(device.clone(), FlatFlags::TEXTURE_TRANSFORMATION).unwrap_err();
    assert_eq!(
        err.to_string(),
        "texture transformation enabled but the shader is not textured"
    );
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn uniform_buffers_need_a_draw_count() {
    let device = SoftwareDevice::default();
    let err = FlatShader3D::with_draw_count(device.clone(), FlatFlags::UNIFORM_BUFFERS, 0).unwrap_err();
    assert_eq!(err.to_string(), "draw count can't be zero");

    // Immediate mode always holds a single draw.
    let shader = FlatShader3D::with_draw_count(device, FlatFlags::empty(), 0).unwrap();
    assert_eq!(shader.draw_count(), 1);
}

#[test]
fn every_violation_is_reported() {
    let err = FlatShader2D::with_draw_count(
        SoftwareDevice::default(),
        FlatFlags::UNIFORM_BUFFERS | FlatFlags::TEXTURE_TRANSFORMATION,
        0,
    )
    .unwrap_err();
    match err {
        ShaderError::Config(config) => assert_eq!(
            config.violations(),
            &[Violation::TextureTransformationNotTextured, Violation::ZeroDrawCount]
        ),
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn missing_capabilities_skip_instead_of_failing() {
    let device = SoftwareDevice::emulating(BackendTier::Gles2, SoftwareConfig::default()).unwrap();

    let err = FlatShader2D::new(device.clone(), FlatFlags::UNIFORM_BUFFERS).unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(err.to_string(), "OpenGL ES 3.0 is not supported");

    let err = FlatShader2D::new(device.clone(), FlatFlags::OBJECT_ID).unwrap_err();
    assert!(matches!(
        err,
        ShaderError::Unsupported {
            capability: Capability::IntegerFramebuffer,
            ..
        }
    ));

    // The plain variant still works on the same device.
    FlatShader2D::new(device, FlatFlags::TEXTURED).unwrap();
}

#[test]
fn skip_takes_precedence_over_violations() {
    let device = SoftwareDevice::emulating(BackendTier::Gles3, SoftwareConfig::default()).unwrap();
    let err = FlatShader2D::with_draw_count(device, FlatFlags::MULTI_DRAW, 0).unwrap_err();
    assert_eq!(err.to_string(), "GL_ANGLE_multi_draw is not supported");
}

#[test]
fn oversized_draw_count_exhausts_uniform_storage() {
    let device = SoftwareDevice::default();
    let err = FlatShader3D::with_draw_count(device.clone(), FlatFlags::UNIFORM_BUFFERS, 1024).unwrap_err();
    assert!(matches!(
        err,
        ShaderError::Gpu(GpuError::ResourceExhausted { limit: 16384, .. })
    ));
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn immediate_setters_reject_uniform_buffer_variants() {
    let mut shader = FlatShader2D::new(SoftwareDevice::default(), FlatFlags::UNIFORM_BUFFERS).unwrap();

    let messages = misuse_messages([
        shader.set_transformation_projection_matrix(Mat3::IDENTITY).map(|_| ()),
        shader.set_texture_matrix(Mat3::IDENTITY).map(|_| ()),
        shader.set_color(Vec4::ONE).map(|_| ()),
        shader.set_alpha_mask(0.5).map(|_| ()),
        shader.set_object_id(0).map(|_| ()),
    ]);
    assert_eq!(
        messages,
        [
            "FlatShader::set_transformation_projection_matrix(): the shader was created with uniform buffers enabled",
            "FlatShader::set_texture_matrix(): the shader was created with uniform buffers enabled",
            "FlatShader::set_color(): the shader was created with uniform buffers enabled",
            "FlatShader::set_alpha_mask(): the shader was created with uniform buffers enabled",
            "FlatShader::set_object_id(): the shader was created with uniform buffers enabled",
        ]
    );
}

#[test]
fn buffer_bindings_reject_immediate_variants() {
    let device = SoftwareDevice::default();
    let buffer = device.create_uniform_buffer(&[0; 256]);
    let mut shader = FlatShader2D::new(device, FlatFlags::TEXTURED | FlatFlags::TEXTURE_TRANSFORMATION).unwrap();

    let messages = misuse_messages([
        shader.bind_transformation_projection_buffer(&buffer).map(|_| ()),
        shader.bind_transformation_projection_buffer_range(&buffer, 0, 16).map(|_| ()),
        shader.bind_draw_buffer(&buffer).map(|_| ()),
        shader.bind_draw_buffer_range(&buffer, 0, 16).map(|_| ()),
        shader.bind_texture_transformation_buffer(&buffer).map(|_| ()),
        shader.bind_texture_transformation_buffer_range(&buffer, 0, 16).map(|_| ()),
        shader.set_draw_offset(0).map(|_| ()),
    ]);
    assert_eq!(
        messages,
        [
            "FlatShader::bind_transformation_projection_buffer(): the shader was not created with uniform buffers enabled",
            "FlatShader::bind_transformation_projection_buffer(): the shader was not created with uniform buffers enabled",
            "FlatShader::bind_draw_buffer(): the shader was not created with uniform buffers enabled",
            "FlatShader::bind_draw_buffer(): the shader was not created with uniform buffers enabled",
            "FlatShader::bind_texture_transformation_buffer(): the shader was not created with uniform buffers enabled",
            "FlatShader::bind_texture_transformation_buffer(): the shader was not created with uniform buffers enabled",
            "FlatShader::set_draw_offset(): the shader was not created with uniform buffers enabled",
        ]
    );
    assert_eq!(shader.state(), BindingState::Unbound);
}

#[test]
fn draw_offset_past_the_end_is_rejected() {
    let mut shader =
        FlatShader2D::with_draw_count(SoftwareDevice::default(), FlatFlags::UNIFORM_BUFFERS, 5).unwrap();
    let err = shader.set_draw_offset(5).unwrap_err();
    assert_eq!(
        err.to_string(),
        "FlatShader::set_draw_offset(): draw offset 5 is out of bounds for 5 draws"
    );
}

#[test]
fn multi_draw_needs_the_flag() {
    let device = SoftwareDevice::default();
    let mut shader = FlatShader2D::with_draw_count(device, FlatFlags::UNIFORM_BUFFERS, 2).unwrap();
    match shader.draw_many(&[]).unwrap_err() {
        ShaderError::Misuse(misuse) => {
            assert_eq!(misuse.kind, MisuseKind::FeatureNotEnabled("multidraw"))
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn drawing_requires_bound_buffers() {
    let device = SoftwareDevice::default();
    let mesh = device.create_mesh(latch_shaders::MeshData::square()).unwrap();
    let mut shader = FlatShader2D::new(device, FlatFlags::UNIFORM_BUFFERS).unwrap();
    let err = shader.draw(&mesh).unwrap_err();
    assert_eq!(
        err.to_string(),
        "FlatShader::draw(): no transformation projection buffer bound"
    );
}

#[test]
fn take_moves_the_program_out() {
    let device = SoftwareDevice::default();
    let mut first = FlatShader2D::new(device.clone(), FlatFlags::TEXTURED).unwrap();
    let id = first.id();
    assert!(id.is_some());

    let second = first.take();
    assert_eq!(second.id(), id);
    assert_eq!(second.flags(), FlatFlags::TEXTURED);
    assert_eq!(first.id(), None);
    assert_eq!(first.flags(), FlatFlags::empty());
    assert_eq!(device.live_programs(), 1);

    drop(first);
    assert_eq!(device.live_programs(), 1);
    drop(second);
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn assigning_over_a_live_shader_releases_its_program() {
    let device = SoftwareDevice::default();
    let mut target = FlatShader2D::new(device.clone(), FlatFlags::TEXTURED).unwrap();
    let mut source = FlatShader2D::new(device.clone(), FlatFlags::VERTEX_COLOR).unwrap();
    let source_id = source.id();
    assert_ne!(target.id(), source_id);
    assert_eq!(device.live_programs(), 2);

    target = source.take();
    assert_eq!(device.live_programs(), 1);
    assert_eq!(target.id(), source_id);
    assert_eq!(target.flags(), FlatFlags::VERTEX_COLOR);
    assert_eq!(source.id(), None);

    drop(source);
    assert_eq!(device.live_programs(), 1);
    drop(target);
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn empty_shader_cannot_draw() {
    let device = SoftwareDevice::default();
    let mesh = device.create_mesh(latch_shaders::MeshData::square()).unwrap();
    let mut shader = FlatShader3D::no_create(device);
    assert_eq!(shader.id(), None);
    let err = shader.draw(&mesh).unwrap_err();
    assert_eq!(err.to_string(), "FlatShader::draw(): the shader has no program");
}
