//! Integration tests for void_reflect

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use void_core::Tuid;
use void_reflect::archive::{self, xml};
use void_reflect::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Filter {
    #[default]
    Point = 0,
    Linear = 2,
    Anisotropic = 7,
}

impl_enumeration!(Filter, "Filter", {
    Point => "Point",
    Linear => "Linear",
    Anisotropic => "Anisotropic (x16)",
});

#[derive(Clone, Debug, Default, PartialEq)]
struct Foo {
    count: i32,
    name: String,
}

impl Reflect for Foo {
    const NAME: &'static str = "Foo";

    fn enumerate(comp: &mut Compositor<Self>) {
        comp.field("m_Count", |s| &s.count, |s| &mut s.count);
        comp.field("m_Name", |s| &s.name, |s| &mut s.name);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Base {
    a: i32,
}

impl Reflect for Base {
    const NAME: &'static str = "Base";

    fn enumerate(comp: &mut Compositor<Self>) {
        comp.field("a", |s| &s.a, |s| &mut s.a);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Derived {
    base: Base,
    b: f32,
}

impl Reflect for Derived {
    const NAME: &'static str = "Derived";

    fn enumerate(comp: &mut Compositor<Self>) {
        comp.field("b", |s| &s.b, |s| &mut s.b);
        comp.inherit::<Base>(|s| &s.base, |s| &mut s.base);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Material {
    filter: Filter,
    texture: PathBuf,
    asset: Tuid,
    tags: Vec<String>,
    layers: BTreeSet<u32>,
    params: BTreeMap<String, f32>,
    child: Option<ObjectPtr>,
    scratch: u64,
    version: u16,
}

impl Reflect for Material {
    const NAME: &'static str = "Content::Material";

    fn enumerate(comp: &mut Compositor<Self>) {
        comp.field("m_Filter", |s| &s.filter, |s| &mut s.filter);
        comp.field("m_Texture", |s| &s.texture, |s| &mut s.texture);
        comp.field("m_Asset", |s| &s.asset, |s| &mut s.asset);
        comp.field("m_Tags", |s| &s.tags, |s| &mut s.tags);
        comp.field("m_Layers", |s| &s.layers, |s| &mut s.layers);
        comp.field("m_Params", |s| &s.params, |s| &mut s.params);
        comp.field("m_Child", |s| &s.child, |s| &mut s.child);
        comp.field("m_Scratch", |s| &s.scratch, |s| &mut s.scratch)
            .flags(FieldFlags::DISCARD);
        comp.field("m_Version", |s| &s.version, |s| &mut s.version)
            .flags(FieldFlags::FORCE);
    }
}

fn registry() -> Registry {
    init_logging();
    let registry = Registry::default();
    registry.register_enum::<Filter>().unwrap();
    registry.register_class::<Foo>().unwrap();
    registry.register_class::<Base>().unwrap();
    registry.register_class::<Derived>().unwrap();
    registry.register_class::<Material>().unwrap();
    registry
}

fn sample_material() -> Material {
    Material {
        filter: Filter::Anisotropic,
        texture: PathBuf::from("textures/brick.png"),
        asset: Tuid::from_raw(0xDEAD_BEEF),
        tags: vec!["wall".into(), "outdoor <lit>".into()],
        layers: [1, 4, 9].into_iter().collect(),
        params: [("roughness".to_string(), 0.25), ("metal".to_string(), 1.0)]
            .into_iter()
            .collect(),
        child: Some(Box::new(Foo {
            count: 3,
            name: "nested".into(),
        })),
        scratch: 99,
        version: 0,
    }
}

#[derive(Default)]
struct CollectingSink {
    states: Vec<ArchiveState>,
    failures: Vec<String>,
}

impl StatusSink for CollectingSink {
    fn status(&mut self, info: &StatusInfo) {
        self.states.push(info.state);
    }

    fn exception(&mut self, failure: &ElementFailure) {
        self.failures.push(failure.type_name.clone());
    }
}

#[test]
fn test_binary_round_trip_scalar_fields() {
    let registry = registry();
    let foo = Foo {
        count: 5,
        name: "widget".into(),
    };

    let bytes = archive::to_bytes(&registry, &[&foo], &Version::current()).unwrap();
    let contents = archive::from_bytes(&registry, &bytes).unwrap();

    assert!(contents.failures.is_empty());
    let read = contents.first::<Foo>().unwrap();
    assert_eq!(read.count, 5);
    assert_eq!(read.name, "widget");
}

#[test]
fn test_inherited_field_order() {
    let registry = registry();
    let class = registry.class_of::<Derived>().unwrap();

    let names: Vec<&str> = class.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(class.base_name(), Some("Base"));
    assert_eq!(class.declared_fields().len(), 1);
    assert!(registry.is_a(class.id(), type_id_of::<Base>()));
    assert!(registry
        .class_of::<Base>()
        .unwrap()
        .derived()
        .contains(&"Derived".to_string()));

    let derived = Derived {
        base: Base { a: 7 },
        b: 1.5,
    };
    let bytes = archive::to_bytes(&registry, &[&derived], &Version::current()).unwrap();
    let read = archive::from_bytes(&registry, &bytes).unwrap().into_first::<Derived>().unwrap();
    assert_eq!(read, derived);
}

#[test]
fn test_conflicting_registration_keeps_first() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct WidgetV1 {
        x: i32,
    }

    impl Reflect for WidgetV1 {
        const NAME: &'static str = "Widget";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("x", |s| &s.x, |s| &mut s.x);
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct WidgetV2 {
        x: i32,
        y: i32,
    }

    impl Reflect for WidgetV2 {
        const NAME: &'static str = "Widget";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("x", |s| &s.x, |s| &mut s.x);
            comp.field("y", |s| &s.y, |s| &mut s.y);
        }
    }

    let registry = registry();
    let first = Type::Class(Arc::new(Class::of::<WidgetV1>().unwrap()));
    let second = Type::Class(Arc::new(Class::of::<WidgetV2>().unwrap()));

    assert!(registry.register_type(first.clone()));
    assert!(!registry.register_type(second));
    assert_eq!(registry.get_class_by_name("Widget").unwrap().fields().len(), 1);

    // identical metadata is accepted again
    assert!(registry.register_type(Type::Class(Arc::new(Class::of::<WidgetV1>().unwrap()))));
    assert!(registry.get_type_by_name("Widget").unwrap().ptr_eq(&first));
}

#[test]
fn test_alias_creates_same_type() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct NewType {
        value: u8,
    }

    impl Reflect for NewType {
        const NAME: &'static str = "NewType";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Value", |s| &s.value, |s| &mut s.value);
        }
    }

    let registry = registry();
    let id = registry.register_class::<NewType>().unwrap();
    assert!(registry.alias_type(id, "OldName"));

    let by_alias = registry.create_instance_by_name("OldName").unwrap();
    let by_name = registry.create_instance_by_name("NewType").unwrap();
    assert!(by_alias.is::<NewType>());
    assert!(by_name.is::<NewType>());
    assert_eq!(by_alias.reflect_type(), by_name.reflect_type());

    // canonical names win over aliases
    assert!(registry.alias_type(type_id_of::<Foo>(), "NewType"));
    assert!(registry.create_instance_by_name("NewType").unwrap().is::<NewType>());

    assert!(registry.unalias_type(id, "OldName"));
    assert!(registry.create_instance_by_name("OldName").is_none());
}

#[test]
fn test_alias_resolves_archived_names() {
    let registry = registry();
    let foo = Foo {
        count: 2,
        name: "legacy".into(),
    };
    let text = xml::to_string(&registry, &[&foo]).unwrap();
    let renamed = text.replace("Type=\"Foo\"", "Type=\"LegacyFoo\"");

    assert!(registry.alias_type(type_id_of::<Foo>(), "LegacyFoo"));
    let contents = xml::from_string(&registry, &renamed).unwrap();
    assert_eq!(contents.first::<Foo>(), Some(&foo));
}

#[test]
fn test_legacy_lookup_is_case_insensitive() {
    let registry = registry();
    assert!(registry.get_type_by_name("foo").is_none());
    assert_eq!(registry.find_type_legacy("foo").unwrap().name(), "Foo");
    // short names resolve too
    assert_eq!(registry.get_type_by_name("Material").unwrap().name(), "Content::Material");
}

#[test]
fn test_enum_requires_registered_enumeration() {
    init_logging();
    let registry = Registry::default();
    assert!(matches!(
        registry.register_class::<Material>(),
        Err(ReflectError::UnknownEnumeration { .. })
    ));
    registry.register_enum::<Filter>().unwrap();
    registry.register_class::<Foo>().unwrap();
    registry.register_class::<Material>().unwrap();
}

#[test]
fn test_binary_round_trip_all_kinds() {
    let registry = registry();
    let material = sample_material();

    let bytes = archive::to_bytes(&registry, &[&material], &Version::current()).unwrap();
    let read = archive::from_bytes(&registry, &bytes).unwrap().into_first::<Material>().unwrap();

    assert_eq!(read.scratch, 0, "discarded fields are never written");
    assert_eq!(read, Material { scratch: 0, ..material });
}

#[test]
fn test_xml_round_trip_all_kinds() {
    let registry = registry();
    let material = sample_material();

    let text = xml::to_string(&registry, &[&material]).unwrap();
    assert!(text.contains("<Reflect FormatVersion=\"1\">"));
    assert!(text.contains("Anisotropic"));
    assert!(text.contains("textures/brick.png"));
    assert!(!text.contains("m_Scratch"));

    let read = xml::from_string(&registry, &text).unwrap().into_first::<Material>().unwrap();
    assert_eq!(read, Material { scratch: 0, ..material });
}

#[test]
fn test_default_fields_are_not_written() {
    let registry = registry();
    let text = xml::to_string(&registry, &[&Material::default()]).unwrap();

    assert!(!text.contains("m_Filter"));
    assert!(!text.contains("m_Tags"));
    // forced fields are always written
    assert!(text.contains("m_Version"));
}

#[test]
fn test_default_value_detection() {
    let registry = registry();
    let class = registry.class_of::<Foo>().unwrap();
    let field = class.find_field_by_name("m_Count").unwrap();

    let mut foo = Foo {
        count: 4,
        name: String::new(),
    };
    assert!(!field.has_default_value(&registry, &foo).unwrap());
    field.set_default_value(&registry, &mut foo).unwrap();
    assert_eq!(foo.count, 0);
    assert!(field.has_default_value(&registry, &foo).unwrap());

    let mut connected = field.create_serializer_mut(&registry, &mut foo).unwrap();
    connected.set(Value::I32(12)).unwrap();
    assert!(!connected.is_default().unwrap());
    assert!(connected.set(Value::String("twelve".into())).is_err());
    drop(connected);
    assert_eq!(foo.count, 12);
}

#[test]
fn test_copy_and_equality_through_common_base() {
    let registry = registry();
    let class = registry.class_of::<Derived>().unwrap();

    let a = Derived {
        base: Base { a: 1 },
        b: 2.0,
    };
    let mut b = a.clone();
    assert!(class.equals(&a, &b));
    b.b = 3.0;
    assert!(!class.equals(&a, &b));

    let mut base = Base::default();
    Class::copy(&registry, &a, &mut base).unwrap();
    assert_eq!(base.a, 1);

    let mut foo = Foo::default();
    assert!(Class::copy(&registry, &a, &mut foo).is_err());
}

#[test]
fn test_unknown_field_is_skipped() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct FooV2 {
        count: i32,
        name: String,
        extra: Vec<i32>,
    }

    impl Reflect for FooV2 {
        const NAME: &'static str = "Foo";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Count", |s| &s.count, |s| &mut s.count);
            comp.field("m_Extra", |s| &s.extra, |s| &mut s.extra);
            comp.field("m_Name", |s| &s.name, |s| &mut s.name);
        }
    }

    init_logging();
    let writer = Registry::default();
    writer.register_class::<FooV2>().unwrap();
    let newer = FooV2 {
        count: 8,
        name: "future".into(),
        extra: vec![1, 2, 3],
    };
    let bytes = archive::to_bytes(&writer, &[&newer], &Version::current()).unwrap();
    let text = xml::to_string(&writer, &[&newer]).unwrap();

    let reader = registry();
    let expected = Foo {
        count: 8,
        name: "future".into(),
    };
    let from_binary = archive::from_bytes(&reader, &bytes).unwrap();
    assert!(from_binary.failures.is_empty());
    assert_eq!(from_binary.first::<Foo>(), Some(&expected));

    let from_xml = xml::from_string(&reader, &text).unwrap();
    assert_eq!(from_xml.first::<Foo>(), Some(&expected));
}

#[test]
fn test_changed_field_type_is_converted() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct ItemV1 {
        value: i32,
        label: String,
    }

    impl Reflect for ItemV1 {
        const NAME: &'static str = "Item";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Value", |s| &s.value, |s| &mut s.value);
            comp.field("m_Label", |s| &s.label, |s| &mut s.label);
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct ItemWide {
        value: i64,
        label: String,
    }

    impl Reflect for ItemWide {
        const NAME: &'static str = "Item";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Value", |s| &s.value, |s| &mut s.value);
            comp.field("m_Label", |s| &s.label, |s| &mut s.label);
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct ItemFloat {
        value: f32,
        label: String,
    }

    impl Reflect for ItemFloat {
        const NAME: &'static str = "Item";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Value", |s| &s.value, |s| &mut s.value);
            comp.field("m_Label", |s| &s.label, |s| &mut s.label);
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct ItemList {
        value: Vec<String>,
        label: String,
    }

    impl Reflect for ItemList {
        const NAME: &'static str = "Item";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Value", |s| &s.value, |s| &mut s.value);
            comp.field("m_Label", |s| &s.label, |s| &mut s.label);
        }
    }

    init_logging();
    let writer = Registry::default();
    writer.register_class::<ItemV1>().unwrap();
    let first = ItemV1 {
        value: 7,
        label: "first".into(),
    };
    let second = ItemV1 {
        value: -3,
        label: "second".into(),
    };
    let objects: [&dyn Object; 2] = [&first, &second];
    let bytes = archive::binary::write(&writer, &objects, &Version::current(), None).unwrap();
    let text = xml::write(&writer, &objects, &Version::current(), None).unwrap();

    let wide = Registry::default();
    wide.register_class::<ItemWide>().unwrap();
    for contents in [
        archive::binary::read(&wide, &bytes, None).unwrap(),
        xml::read(&wide, &text, None).unwrap(),
    ] {
        assert!(contents.failures.is_empty());
        let read: Vec<(i64, &str)> = contents
            .elements
            .iter()
            .filter_map(|e| e.downcast_ref::<ItemWide>())
            .map(|item| (item.value, item.label.as_str()))
            .collect();
        assert_eq!(read, [(7, "first"), (-3, "second")]);
    }

    let float = Registry::default();
    float.register_class::<ItemFloat>().unwrap();
    for contents in [
        archive::binary::read(&float, &bytes, None).unwrap(),
        xml::read(&float, &text, None).unwrap(),
    ] {
        assert!(contents.failures.is_empty());
        let read: Vec<f32> = contents
            .elements
            .iter()
            .filter_map(|e| e.downcast_ref::<ItemFloat>())
            .map(|item| item.value)
            .collect();
        assert_eq!(read, [7.0, -3.0]);
    }

    // no conversion from a number to a list, the field keeps its default
    let list = Registry::default();
    list.register_class::<ItemList>().unwrap();
    for contents in [
        archive::binary::read(&list, &bytes, None).unwrap(),
        xml::read(&list, &text, None).unwrap(),
    ] {
        assert!(contents.failures.is_empty());
        assert_eq!(contents.elements.len(), 2);
        let item = contents.first::<ItemList>().unwrap();
        assert!(item.value.is_empty());
        assert_eq!(item.label, "first");
    }
}

#[test]
fn test_removed_enum_constant_keeps_default() {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    enum ModeV1 {
        #[default]
        Solid = 0,
        Wire = 1,
    }

    impl_enumeration!(ModeV1, "Mode", {
        Solid => "Solid",
        Wire => "Wire",
    });

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    enum ModeV2 {
        #[default]
        Solid = 0,
    }

    impl_enumeration!(ModeV2, "Mode", {
        Solid => "Solid",
    });

    #[derive(Clone, Debug, Default, PartialEq)]
    struct ViewV1 {
        mode: ModeV1,
        lines: i32,
    }

    impl Reflect for ViewV1 {
        const NAME: &'static str = "View";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Mode", |s| &s.mode, |s| &mut s.mode);
            comp.field("m_Lines", |s| &s.lines, |s| &mut s.lines);
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct ViewV2 {
        mode: ModeV2,
        lines: i32,
    }

    impl Reflect for ViewV2 {
        const NAME: &'static str = "View";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Mode", |s| &s.mode, |s| &mut s.mode);
            comp.field("m_Lines", |s| &s.lines, |s| &mut s.lines);
        }
    }

    init_logging();
    let writer = Registry::default();
    writer.register_enum::<ModeV1>().unwrap();
    writer.register_class::<ViewV1>().unwrap();
    let view = ViewV1 {
        mode: ModeV1::Wire,
        lines: 42,
    };
    let bytes = archive::to_bytes(&writer, &[&view], &Version::current()).unwrap();
    let text = xml::to_string(&writer, &[&view]).unwrap();

    let reader = Registry::default();
    reader.register_enum::<ModeV2>().unwrap();
    reader.register_class::<ViewV2>().unwrap();
    let expected = ViewV2 {
        mode: ModeV2::Solid,
        lines: 42,
    };
    for contents in [
        archive::from_bytes(&reader, &bytes).unwrap(),
        xml::from_string(&reader, &text).unwrap(),
    ] {
        assert!(contents.failures.is_empty());
        assert_eq!(contents.first::<ViewV2>(), Some(&expected));
    }
}

#[test]
fn test_unknown_element_is_isolated() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Plugin {
        level: i64,
    }

    impl Reflect for Plugin {
        const NAME: &'static str = "Plugin";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Level", |s| &s.level, |s| &mut s.level);
        }
    }

    let writer = registry();
    writer.register_class::<Plugin>().unwrap();
    let foo = Foo {
        count: 1,
        name: "kept".into(),
    };
    let plugin = Plugin { level: 9 };
    let objects: [&dyn Object; 3] = [&foo, &plugin, &foo];

    let bytes = archive::binary::write(&writer, &objects, &Version::current(), None).unwrap();
    let text = xml::write(&writer, &objects, &Version::current(), None).unwrap();

    let reader = registry();
    for contents in [
        {
            let mut sink = CollectingSink::default();
            let contents = archive::binary::read(&reader, &bytes, Some(&mut sink)).unwrap();
            assert_eq!(sink.failures, ["Plugin"]);
            assert_eq!(sink.states.first(), Some(&ArchiveState::Starting));
            assert_eq!(sink.states.last(), Some(&ArchiveState::Complete));
            assert!(sink.states.contains(&ArchiveState::PostProcessing));
            contents
        },
        xml::read(&reader, &text, None).unwrap(),
    ] {
        assert_eq!(contents.elements.len(), 2);
        assert_eq!(contents.failures.len(), 1);
        assert_eq!(contents.failures[0].index, 1);
        assert!(matches!(contents.failures[0].error, ReflectError::UnknownType(_)));
    }
}

#[test]
fn test_corrupted_stream_fails_whole_read() {
    let registry = registry();
    let mut bytes = archive::to_bytes(&registry, &[&sample_material()], &Version::current()).unwrap();
    let last = bytes.len() - 6;
    bytes[last] ^= 0x55;

    assert!(matches!(
        archive::from_bytes(&registry, &bytes),
        Err(ReflectError::Checksum { .. })
    ));
}

#[test]
fn test_upgrade_and_post_deserialize() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Counter {
        hits: u32,
        upgraded_from: String,
        loaded: bool,
    }

    impl Reflect for Counter {
        const NAME: &'static str = "Counter";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Hits", |s| &s.hits, |s| &mut s.hits);
        }

        fn upgrade(&mut self, from: &Version) {
            self.upgraded_from = from.source_version.clone();
        }

        fn post_deserialize(&mut self) {
            self.loaded = true;
        }
    }

    let registry = registry();
    registry.register_class::<Counter>().unwrap();
    let counter = Counter {
        hits: 3,
        ..Default::default()
    };

    let current = archive::to_bytes(&registry, &[&counter], &Version::current()).unwrap();
    let read = archive::from_bytes(&registry, &current).unwrap().into_first::<Counter>().unwrap();
    assert!(read.loaded);
    assert!(read.upgraded_from.is_empty());

    let old = Version::new(Version::SOURCE, "0.0.1");
    let bytes = archive::to_bytes(&registry, &[&counter], &old).unwrap();
    let contents = archive::from_bytes(&registry, &bytes).unwrap();
    assert_eq!(contents.version, old);
    let read = contents.into_first::<Counter>().unwrap();
    assert_eq!(read.hits, 3);
    assert_eq!(read.upgraded_from, "0.0.1");
    assert!(read.loaded);
}

#[test]
fn test_nesting_depth_is_limited() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Node {
        next: Option<ObjectPtr>,
    }

    impl Reflect for Node {
        const NAME: &'static str = "Node";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Next", |s| &s.next, |s| &mut s.next);
        }
    }

    let chain = |len: usize| {
        let mut node = Node::default();
        for _ in 0..len {
            node = Node {
                next: Some(Box::new(node)),
            };
        }
        node
    };

    init_logging();
    let registry = Registry::new(RegistryConfig {
        max_archive_depth: 4,
        ..Default::default()
    });
    registry.register_class::<Node>().unwrap();

    let shallow = chain(2);
    let bytes = archive::to_bytes(&registry, &[&shallow], &Version::current()).unwrap();
    assert_eq!(archive::from_bytes(&registry, &bytes).unwrap().first::<Node>(), Some(&shallow));

    let deep = chain(8);
    let bytes = archive::to_bytes(&registry, &[&deep], &Version::current()).unwrap();
    let contents = archive::from_bytes(&registry, &bytes).unwrap();
    assert!(contents.elements.is_empty());
    assert!(matches!(contents.failures[0].error, ReflectError::DepthExceeded(4)));
}

#[test]
fn test_file_round_trip() {
    let registry = registry();
    let dir = tempfile::tempdir().unwrap();
    let material = sample_material();

    for file in ["material.bin", "material.xml"] {
        let path = dir.path().join(file);
        archive::to_file(&registry, &material, &path, &Version::current()).unwrap();
        let read: Material = archive::from_file(&registry, &path).unwrap();
        assert_eq!(read, Material { scratch: 0, ..material.clone() });
    }

    let missing = dir.path().join("missing.bin");
    assert!(matches!(
        archive::from_file::<Material>(&registry, &missing),
        Err(ReflectError::File { .. })
    ));
}

#[test]
fn test_visitor_reaches_nested_elements() {
    struct Names(Vec<String>);

    impl Visitor for Names {
        fn visit_field(&mut self, _object: &dyn Object, field: &Field, _value: &Value) -> bool {
            self.0.push(field.name().to_string());
            true
        }
    }

    let registry = registry();
    let class = registry.class_of::<Material>().unwrap();
    let mut names = Names(Vec::new());
    class.visit(&registry, &sample_material(), &mut names).unwrap();

    assert!(names.0.contains(&"m_Child".to_string()));
    assert!(names.0.contains(&"m_Name".to_string()));
}

#[test]
fn test_tracker_counts_archive_instances() {
    init_logging();
    let registry = Registry::new(RegistryConfig {
        track_allocations: true,
        ..Default::default()
    });
    registry.register_class::<Foo>().unwrap();

    let foo = Foo {
        count: 1,
        name: "tracked".into(),
    };
    let bytes = archive::to_bytes(&registry, &[&foo, &foo], &Version::current()).unwrap();
    let contents = archive::from_bytes(&registry, &bytes).unwrap();

    let tracker = registry.tracker().unwrap();
    // two elements plus the version record
    assert_eq!(tracker.created_count(), 3);
    assert_eq!(tracker.live_count(), 2);
    assert!(tracker.leaks().iter().all(|(_, name)| *name == "Foo"));
    for element in contents.elements {
        registry.release(element);
    }
    assert_eq!(tracker.live_count(), 0);
    assert_eq!(tracker.deleted_count(), 3);
}

#[test]
fn test_tracker_releases_nested_elements() {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Leaf {
        weight: u32,
    }

    impl Reflect for Leaf {
        const NAME: &'static str = "Leaf";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Weight", |s| &s.weight, |s| &mut s.weight);
        }
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Holder {
        child: Option<ObjectPtr>,
        spares: Vec<ObjectPtr>,
    }

    impl Reflect for Holder {
        const NAME: &'static str = "Holder";

        fn enumerate(comp: &mut Compositor<Self>) {
            comp.field("m_Child", |s| &s.child, |s| &mut s.child);
            comp.field("m_Spares", |s| &s.spares, |s| &mut s.spares);
        }
    }

    init_logging();
    let registry = Registry::new(RegistryConfig {
        track_allocations: true,
        ..Default::default()
    });
    registry.register_class::<Leaf>().unwrap();
    registry.register_class::<Holder>().unwrap();

    let holder = Holder {
        child: Some(Box::new(Leaf { weight: 1 })),
        spares: vec![Box::new(Leaf { weight: 2 }), Box::new(Leaf { weight: 3 })],
    };
    let bytes = archive::to_bytes(&registry, &[&holder], &Version::current()).unwrap();
    let text = xml::to_string(&registry, &[&holder]).unwrap();
    let tracker = registry.tracker().unwrap();

    let release_all = |contents: ArchiveContents| {
        assert_eq!(contents.first::<Holder>(), Some(&holder));
        // the holder and its three leaves
        assert_eq!(tracker.live_count(), 4);
        for element in contents.elements {
            registry.release(element);
        }
        assert_eq!(tracker.live_count(), 0);
        assert!(tracker.leaks().is_empty());
    };
    release_all(archive::from_bytes(&registry, &bytes).unwrap());
    release_all(xml::from_string(&registry, &text).unwrap());
    // two reads of a version record, a holder and three leaves
    assert_eq!(tracker.created_count(), 10);
    assert_eq!(tracker.deleted_count(), 10);
}

#[test]
fn test_cleanup_unregisters_in_reverse_order() {
    let registry = registry();
    assert!(registry.contains(type_id_of::<Material>()));

    registry.cleanup();
    assert!(!registry.contains(type_id_of::<Material>()));
    assert!(!registry.contains(type_id_of::<Foo>()));
    assert!(registry.get_enumeration_by_name("Filter").is_none());
    assert_eq!(registry.type_count(), 0);
}
