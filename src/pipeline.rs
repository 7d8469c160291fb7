//! End-to-end conversion: source → paths → contours → meshes → scene → document.

use rayon::prelude::*;
use tracing::info;

use crate::config::ConversionConfig;
use crate::document::Document;
use crate::error::Result;
use crate::export::export_document;
use crate::extract::{ExtractOptions, extract_contours};
use crate::extrude::{ExtrusionProfile, extrude};
use crate::mesh::Mesh;
use crate::scene::{SceneGraph, compose};
use crate::source::{PathSource, load_paths};
use crate::types::{ContourSet, VectorPath};

/// Extrude every contour set in parallel, failing the whole batch when any
/// shape fails. Meshes come back in input order; with several failures the
/// error of the lowest shape index is returned.
pub fn extrude_all(sets: &[ContourSet], profile: &ExtrusionProfile) -> Result<Vec<Mesh>> {
    let results: Vec<Result<Mesh>> = sets
        .par_iter()
        .enumerate()
        .map(|(i, set)| extrude(set, profile).map_err(|e| e.at_shape(i)))
        .collect();
    results.into_iter().collect()
}

/// Build the normalized scene for already loaded paths.
pub fn build_scene(
    paths: &[VectorPath],
    config: &ConversionConfig,
    options: &ExtractOptions,
) -> Result<SceneGraph> {
    let config = config.clone().validate()?;
    let sets = extract_contours(paths, options)?;
    info!(paths = paths.len(), shapes = sets.len(), "extracted contours");

    let meshes = extrude_all(&sets, &config.profile())?;
    let mut graph = compose(meshes);
    graph.normalize(config.target_size)?;
    Ok(graph)
}

/// Load `source` and convert it into a document.
pub fn convert(
    source: &PathSource,
    config: &ConversionConfig,
    options: &ExtractOptions,
) -> Result<Document> {
    let paths = load_paths(source)?;
    let graph = build_scene(&paths, config, options)?;
    let document = export_document(&graph)?;
    info!(
        vertices = document.vertex_count(),
        bytes = document.binary.len(),
        "converted"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Contour, ContourSet};
    use glam::DVec2;

    fn square(x: f64) -> ContourSet {
        ContourSet::new(Contour::new(vec![
            DVec2::new(x, 0.0),
            DVec2::new(x + 1.0, 0.0),
            DVec2::new(x + 1.0, 1.0),
            DVec2::new(x, 1.0),
        ]))
    }

    #[test]
    fn test_extrude_all_keeps_order() {
        let sets: Vec<_> = (0..16).map(|i| square(i as f64 * 2.0)).collect();
        let meshes = extrude_all(&sets, &ExtrusionProfile::flat(1.0)).unwrap();
        assert_eq!(meshes.len(), 16);
        for (i, mesh) in meshes.iter().enumerate() {
            assert_eq!(mesh.bounds().unwrap().min.x, i as f64 * 2.0);
        }
    }

    #[test]
    fn test_extrude_all_reports_failing_shape() {
        let mut sets = vec![square(0.0), square(2.0), square(4.0)];
        sets[2] = ContourSet::new(Contour::new(vec![DVec2::ZERO, DVec2::X, DVec2::new(2.0, 0.0)]));
        match extrude_all(&sets, &ExtrusionProfile::flat(1.0)).unwrap_err() {
            Error::DegenerateGeometry { shape_index, .. } => assert_eq!(shape_index, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extrude_all_reports_lowest_failing_shape() {
        let collinear = || {
            ContourSet::new(Contour::new(vec![DVec2::ZERO, DVec2::X, DVec2::new(2.0, 0.0)]))
        };
        let mut sets: Vec<_> = (0..64).map(|i| square(i as f64 * 2.0)).collect();
        for i in [5, 17, 40, 63] {
            sets[i] = collinear();
        }
        for _ in 0..8 {
            match extrude_all(&sets, &ExtrusionProfile::flat(1.0)).unwrap_err() {
                Error::DegenerateGeometry { shape_index, .. } => assert_eq!(shape_index, 5),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_convert_path_data() {
        let config = ConversionConfig {
            depth: 2.0,
            bevel_enabled: false,
            ..Default::default()
        };
        let doc = convert(
            &PathSource::PathData("M0 0 L10 0 L10 10 L0 10 Z".into()),
            &config,
            &ExtractOptions::default(),
        )
        .unwrap();
        assert_eq!(doc.vertex_count(), 8);
        assert_eq!(doc.accessors[2].count, 36);
        assert_eq!(doc.nodes[0].scale, Some([6.0, 6.0, 6.0]));
    }
}
