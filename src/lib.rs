//! # svg-extrude
//!
//! Turns flat vector artwork into a beveled 3-D solid and writes it out as a
//! glTF 2.0 document.
//!
//! ## Stages
//!
//! - **Source**: load SVG text from memory, a file or a URL, or take a bare
//!   path `d` string ([`source`], [`parser`])
//! - **Extract**: flatten paths into closed contours grouped as outer
//!   boundaries with holes ([`extract`])
//! - **Extrude**: sweep each contour set into a capped, beveled mesh
//!   ([`extrude`])
//! - **Compose**: collect the meshes under one root and fit them to a target
//!   size ([`scene`])
//! - **Export**: flatten the scene into a glTF document, as JSON or GLB
//!   ([`export`], [`document`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use svg_extrude::{ConversionConfig, ExtractOptions, PathSource, convert};
//!
//! let source = PathSource::File("logo.svg".into());
//! let doc = convert(&source, &ConversionConfig::default(), &ExtractOptions::default()).unwrap();
//! std::fs::write("logo.gltf", doc.to_json_bytes().unwrap()).unwrap();
//! ```

pub mod bounds;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod extrude;
pub mod interaction;
pub mod mesh;
pub mod parser;
pub mod pipeline;
pub mod polygon;
pub mod scene;
pub mod source;
pub mod types;

// Re-export commonly used items
pub use config::ConversionConfig;
pub use document::Document;
pub use error::{Error, Result};
pub use export::export_document;
pub use extract::{ExtractOptions, extract_contours};
pub use extrude::{ExtrusionProfile, extrude};
pub use interaction::{DragState, Interaction};
pub use mesh::{Material, Mesh};
pub use parser::parse_path_data;
pub use pipeline::{build_scene, convert, extrude_all};
pub use scene::{SceneGraph, SceneNode, Transform, compose, normalize};
pub use source::{PathSource, load_paths, parse_document};
pub use types::{Contour, ContourSet, FillRule, PathCommand, VectorPath};
