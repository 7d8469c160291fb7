//! The preview orientation must never reach an exported document.

use glam::DVec2;
use svg_extrude::{
    ConversionConfig, DragState, ExtractOptions, Interaction, PathSource, SceneGraph, build_scene,
    export_document, load_paths,
};

fn scene() -> SceneGraph {
    let paths = load_paths(&PathSource::PathData(
        "M0 0 H20 V10 H0 Z M30 0 h10 v10 h-10 z".into(),
    ))
    .unwrap();
    build_scene(&paths, &ConversionConfig::default(), &ExtractOptions::default()).unwrap()
}

fn export_bytes(graph: &SceneGraph) -> Vec<u8> {
    export_document(graph).unwrap().to_json_bytes().unwrap()
}

mod state_machine_tests {
    use super::*;

    #[test]
    fn test_idle_drag_idle() {
        let mut it = Interaction::new();
        it.tick();
        let yaw_after_tick = it.yaw;
        assert!(yaw_after_tick > 0.0);

        it.pointer_down(DVec2::new(100.0, 100.0));
        it.pointer_move(DVec2::new(110.0, 100.0));
        it.tick();
        assert!((it.yaw - (yaw_after_tick + 0.1)).abs() < 1e-12);
        assert!(matches!(it.state(), DragState::Dragging { .. }));

        it.pointer_up();
        it.tick();
        assert!(it.yaw > yaw_after_tick + 0.1);
    }

    #[test]
    fn test_reset_is_identity() {
        let mut it = Interaction::new();
        for _ in 0..500 {
            it.tick();
        }
        it.reset();
        assert_eq!(it.orientation(), glam::DQuat::IDENTITY);
    }
}

mod export_determinism_tests {
    use super::*;

    #[test]
    fn test_idle_rotation_does_not_change_export() {
        let mut graph = scene();
        let before = export_bytes(&graph);

        let mut it = Interaction::new();
        for _ in 0..1000 {
            it.tick();
            graph.set_orientation(it.orientation());
        }
        assert_eq!(export_bytes(&graph), before);
    }

    #[test]
    fn test_drag_does_not_change_export() {
        let mut graph = scene();
        let before = export_bytes(&graph);

        let mut it = Interaction::new();
        it.pointer_down(DVec2::ZERO);
        for step in 1..50 {
            it.pointer_move(DVec2::new(step as f64 * 3.0, step as f64 * -2.0));
            graph.set_orientation(it.orientation());
        }
        it.pointer_up();
        assert_eq!(export_bytes(&graph), before);
    }

    #[test]
    fn test_independent_scenes_export_identically() {
        let mut a = scene();
        let b = scene();
        a.set_orientation(glam::DQuat::from_rotation_x(1.0));
        assert_eq!(export_bytes(&a), export_bytes(&b));
    }
}
