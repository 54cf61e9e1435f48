use std::path::PathBuf;

use kinema_engine::{render_range, CollectingSink, Compositor, Existence};
use kinema_ir::SceneDescriptor;

fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/reaction")
}

fn demo_compositor() -> Compositor {
    let dir = demo_dir();
    let scene = SceneDescriptor::load_from_file(&dir.join("scene.json")).expect("demo scene loads");
    Compositor::with_json_bodies(scene, dir).expect("demo scene is valid")
}

#[test]
fn test_demo_order() {
    let c = demo_compositor();
    assert_eq!(
        c.order(),
        ["camera", "ethanol", "nad", "marker", "h_proton", "h_hydride"]
    );
}

#[test]
fn test_demo_full_render() {
    let mut c = demo_compositor();
    let range = c.scene().frame_range();
    let mut sink = CollectingSink::new();
    let summary = render_range(&mut c, range, &mut sink).unwrap();
    assert_eq!(summary.frames, 150);

    assert_eq!(c.existence("h_hydride"), Some(Existence::Merged));
    assert_eq!(c.existence("h_proton"), Some(Existence::Active));
    assert_eq!(c.element_count("ethanol"), Some(7));
    assert_eq!(c.element_count("nad"), Some(7));

    let before_split = &sink.frames[79];
    assert_eq!(before_split.items_for("h_proton").count(), 0);
    let after_split = &sink.frames[80];
    assert_eq!(after_split.items_for("h_proton").count(), 1);
    let hidden = &sink.frames[110];
    assert_eq!(hidden.items_for("h_proton").count(), 0);

    // Labels for ethanol and nad, one sphere for the marker.
    let last = &sink.frames[149];
    assert_eq!(last.items_for("marker").count(), 1);
    assert_eq!(last.items_for("ethanol").count(), 2);
    assert_eq!(last.camera.eye, kinema_core::Vec3::new(0.0, 0.0, 100.0));
}
