//! Shared registry lifecycle
//!
//! Kept in its own test binary with a single test, the global registry is
//! process-wide state.

use void_reflect::*;

#[derive(Clone, Debug, Default, PartialEq)]
struct Beacon {
    id: u32,
}

impl Reflect for Beacon {
    const NAME: &'static str = "Beacon";

    fn enumerate(comp: &mut Compositor<Self>) {
        comp.field("m_Id", |s| &s.id, |s| &mut s.id);
    }
}

#[test]
fn test_reference_counted_initialize_and_cleanup() {
    let _ = env_logger::builder().is_test(true).try_init();
    assert!(!is_initialized());
    assert!(registry().is_none());

    let first = initialize();
    first.register_class::<Beacon>().unwrap();
    let second = initialize();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    cleanup();
    assert!(is_initialized());
    assert!(first.contains(type_id_of::<Beacon>()), "inner cleanup keeps types");

    cleanup();
    assert!(!is_initialized());
    assert!(registry().is_none());
    assert!(!first.contains(type_id_of::<Beacon>()));
    assert!(!first.contains(type_id_of::<Version>()));

    let fresh = initialize();
    assert!(!std::sync::Arc::ptr_eq(&first, &fresh));
    assert!(fresh.contains(type_id_of::<Version>()));
    cleanup();
}
