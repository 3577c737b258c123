use naga::front::wgsl::parse_str;
use naga::valid::{Capabilities, ValidationFlags, Validator};

const SHADERS: &[(&str, &str)] = &[
    ("points", include_str!("../src/shaders/points.wgsl")),
    ("fluid", include_str!("../src/shaders/fluid.wgsl")),
];

fn parse(name: &str, source: &str) -> naga::Module {
    parse_str(source).unwrap_or_else(|err| panic!("{name}: {}", err.emit_to_string(source)))
}

fn uniform_struct_span(module: &naga::Module, name: &str) -> u32 {
    module
        .types
        .iter()
        .find_map(|(_, ty)| match &ty.inner {
            naga::TypeInner::Struct { span, .. } if ty.name.as_deref() == Some(name) => {
                Some(*span)
            }
            _ => None,
        })
        .unwrap_or_else(|| panic!("struct {name} not found"))
}

#[test]
fn test_shaders_parse_and_validate() {
    for (name, source) in SHADERS {
        let module = parse(name, source);
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .unwrap_or_else(|err| panic!("{name}: {err:?}"));

        let entries: Vec<_> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(entries.contains(&"vs_main"), "{name}: missing vs_main");
        assert!(entries.contains(&"fs_main"), "{name}: missing fs_main");
    }
}

#[test]
fn test_uniform_layouts_match_host() {
    let points = parse("points", SHADERS[0].1);
    assert_eq!(
        uniform_struct_span(&points, "PointUniforms") as usize,
        std::mem::size_of::<glaze_field::PointUniforms>()
    );

    let fluid = parse("fluid", SHADERS[1].1);
    assert_eq!(
        uniform_struct_span(&fluid, "FluidUniforms") as usize,
        std::mem::size_of::<glaze_field::FluidUniforms>()
    );
}
