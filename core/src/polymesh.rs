//! Turns the ASCII polyMesh files written by blockMesh into plain geometry
//! that a viewer can render directly.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMesh {
    pub points: Vec<[f64; 3]>,
    pub faces: Vec<Vec<usize>>,
    /// Indices into `faces` that lie on a boundary patch.
    pub surface_faces: Vec<usize>,
}

fn foam_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"FoamFile\s*\{[^}]*\}").expect("header regex"))
}

fn point_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\s*([-+\d.eE]+)\s+([-+\d.eE]+)\s+([-+\d.eE]+)\s*\)")
            .expect("point regex")
    })
}

fn face_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*\(([\d\s]+)\)").expect("face regex"))
}

fn boundary_patch() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\w+)\s*\{[^}]*?nFaces\s+(\d+)\s*;\s*startFace\s+(\d+)\s*;")
            .expect("boundary regex")
    })
}

/// Parses the files returned by [`crate::case::CaseDir::read_polymesh`].
///
/// Returns `None` when `points` or `faces` is missing or no point could be
/// read. `boundary` is optional: without usable patches every face counts as
/// a surface face.
pub fn parse(files: &BTreeMap<String, String>) -> Option<ParsedMesh> {
    let (Some(points_text), Some(faces_text)) = (files.get("points"), files.get("faces")) else {
        debug!("polyMesh has no points/faces, nothing to parse");
        return None;
    };

    let points = parse_points(points_text);
    if points.is_empty() {
        warn!("No points could be parsed from polyMesh/points");
        return None;
    }

    let faces = parse_faces(faces_text);
    let mut surface_faces = files
        .get("boundary")
        .map(|text| parse_boundary_faces(text, faces.len()))
        .unwrap_or_default();
    if surface_faces.is_empty() {
        surface_faces = (0..faces.len()).collect();
    }

    debug!(
        "Parsed polyMesh: {} points, {} faces, {} surface faces",
        points.len(),
        faces.len(),
        surface_faces.len()
    );
    Some(ParsedMesh {
        points,
        faces,
        surface_faces,
    })
}

/// Everything after the `FoamFile { ... }` dictionary, or the whole text if
/// there is none.
fn list_body(text: &str) -> &str {
    match foam_header().find(text) {
        Some(header) => &text[header.end()..],
        None => text,
    }
}

// Entries are scanned rather than read line by line: short lists are written
// on a single line, e.g. `8((0 0 0) (1 0 0) ...)`.
fn parse_points(text: &str) -> Vec<[f64; 3]> {
    point_entry()
        .captures_iter(list_body(text))
        .filter_map(|caps| {
            let x = caps[1].parse::<f64>().ok()?;
            let y = caps[2].parse::<f64>().ok()?;
            let z = caps[3].parse::<f64>().ok()?;
            Some([x, y, z])
        })
        .collect()
}

fn parse_faces(text: &str) -> Vec<Vec<usize>> {
    face_entry()
        .captures_iter(list_body(text))
        .filter_map(|caps| {
            let size = caps[1].parse::<usize>().ok()?;
            let face = caps[2]
                .split_whitespace()
                .map(|i| i.parse().ok())
                .collect::<Option<Vec<usize>>>()?;
            (size > 0 && face.len() == size).then_some(face)
        })
        .collect()
}

fn parse_boundary_faces(text: &str, face_count: usize) -> Vec<usize> {
    let mut surface = Vec::new();
    for caps in boundary_patch().captures_iter(text) {
        let (Ok(n_faces), Ok(start)) = (caps[2].parse::<usize>(), caps[3].parse::<usize>()) else {
            continue;
        };
        debug!("Patch {}: {} faces from {}", &caps[1], n_faces, start);
        let end = start.saturating_add(n_faces).min(face_count);
        surface.extend(start.min(end)..end);
    }
    surface
}
