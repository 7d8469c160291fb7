//! Loading vector artwork: SVG documents, files, URLs and bare path data.

use std::fmt;
use std::path::PathBuf;

use glam::DVec2;
use tracing::{debug, info, warn};
use usvg::tiny_skia_path::{PathSegment, Point};

use crate::error::{Error, Result};
use crate::parser::parse_path_data;
use crate::types::{FillRule, PathCommand, VectorPath};

/// Where the artwork comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PathSource {
    /// SVG document held in memory
    Text(String),
    /// SVG file on disk
    File(PathBuf),
    /// SVG document fetched over HTTP(S)
    Url(String),
    /// A bare path `d` attribute
    PathData(String),
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSource::Text(_) => write!(f, "inline SVG"),
            PathSource::File(path) => write!(f, "{}", path.display()),
            PathSource::Url(url) => write!(f, "{}", url),
            PathSource::PathData(_) => write!(f, "inline path data"),
        }
    }
}

/// Read the raw text of a source.
pub fn load_text(source: &PathSource) -> Result<String> {
    match source {
        PathSource::Text(text) | PathSource::PathData(text) => Ok(text.clone()),
        PathSource::File(path) => {
            std::fs::read_to_string(path).map_err(|e| Error::source_load(source.to_string(), e))
        }
        PathSource::Url(url) => fetch(url),
    }
}

#[cfg(feature = "fetch")]
fn fetch(url: &str) -> Result<String> {
    debug!(url, "fetching");
    let response = ureq::get(url)
        .call()
        .map_err(|e| Error::source_load(url, e))?;
    response
        .into_string()
        .map_err(|e| Error::source_load(url, e))
}

#[cfg(not(feature = "fetch"))]
fn fetch(url: &str) -> Result<String> {
    Err(Error::source_load(
        url,
        "URL sources need the `fetch` feature",
    ))
}

/// Load a source and turn it into vector paths.
pub fn load_paths(source: &PathSource) -> Result<Vec<VectorPath>> {
    let text = load_text(source)?;
    let paths = match source {
        PathSource::PathData(d) => vec![VectorPath::new("path_0", parse_path_data(d)?)],
        _ => parse_document(&text).map_err(|e| match e {
            Error::SourceLoad { source: cause, .. } => Error::SourceLoad {
                source_name: source.to_string(),
                source: cause,
            },
            other => other,
        })?,
    };
    info!(source = %source, paths = paths.len(), "loaded vector paths");
    Ok(paths)
}

/// Parse an SVG document into vector paths in document order.
///
/// Shapes arrive as paths after usvg's conversion; each path's absolute
/// transform is applied to its points. Text and images are skipped.
pub fn parse_document(text: &str) -> Result<Vec<VectorPath>> {
    let options = usvg::Options::default();
    let tree =
        usvg::Tree::from_str(text, &options).map_err(|e| Error::source_load("SVG document", e))?;

    let mut paths = Vec::new();
    collect_group(tree.root(), &mut paths)?;
    Ok(paths)
}

fn collect_group(group: &usvg::Group, paths: &mut Vec<VectorPath>) -> Result<()> {
    for child in group.children() {
        match child {
            usvg::Node::Group(g) => collect_group(g, paths)?,
            usvg::Node::Path(path) => {
                if let Some(p) = convert_path(path, paths.len())? {
                    paths.push(p);
                }
            }
            usvg::Node::Image(_) => warn!("skipping embedded image"),
            usvg::Node::Text(_) => warn!("skipping text node"),
        }
    }
    Ok(())
}

fn convert_path(path: &usvg::Path, index: usize) -> Result<Option<VectorPath>> {
    if path.fill().is_none() && path.stroke().is_none() {
        debug!(id = path.id(), "skipping path without fill or stroke");
        return Ok(None);
    }

    let t = path.abs_transform();
    let map = |p: Point| {
        let (x, y) = (p.x as f64, p.y as f64);
        DVec2::new(
            t.sx as f64 * x + t.kx as f64 * y + t.tx as f64,
            t.ky as f64 * x + t.sy as f64 * y + t.ty as f64,
        )
    };

    let commands: Vec<PathCommand> = path
        .data()
        .segments()
        .map(|seg| match seg {
            PathSegment::MoveTo(p) => PathCommand::MoveTo(map(p)),
            PathSegment::LineTo(p) => PathCommand::LineTo(map(p)),
            PathSegment::QuadTo(c, p) => PathCommand::QuadTo {
                ctrl: map(c),
                end: map(p),
            },
            PathSegment::CubicTo(c1, c2, p) => PathCommand::CubicTo {
                ctrl1: map(c1),
                ctrl2: map(c2),
                end: map(p),
            },
            PathSegment::Close => PathCommand::Close,
        })
        .collect();

    if commands.is_empty() {
        return Ok(None);
    }
    check_finite(&commands, index)?;

    let fill_rule = match path.fill().map(|f| f.rule()) {
        Some(usvg::FillRule::EvenOdd) => FillRule::EvenOdd,
        _ => FillRule::NonZero,
    };
    let id = if path.id().is_empty() {
        format!("path_{}", index)
    } else {
        path.id().to_string()
    };
    Ok(Some(VectorPath::new(id, commands).with_fill_rule(fill_rule)))
}

/// Reject commands whose coordinates overflowed during transformation.
fn check_finite(commands: &[PathCommand], path_index: usize) -> Result<()> {
    match commands.iter().position(|c| !c.is_finite()) {
        Some(command_index) => Err(Error::SvgParse {
            path_index,
            command_index,
            message: format!("{} has a non-finite coordinate", commands[command_index].name()),
        }),
        None => Ok(()),
    }
}
