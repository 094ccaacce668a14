use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use geojson::{GeoJson, Geometry, Value};
use glam::DVec2;
use serde::Deserialize;

use crate::data::iso;
use crate::error::{LoadError, LoadResult};

/// A closed ring of (lon, lat) points
pub type Ring = Vec<DVec2>;

/// One country polygon set from the map outline
#[derive(Debug, Clone)]
pub struct CountryShape {
    /// ISO alpha-3 code, `None` when the feature could not be resolved
    pub code: Option<String>,
    pub name: Option<String>,
    /// Outer rings and holes of every polygon, tested with the even-odd rule
    pub rings: Vec<Ring>,
    /// (min_lon, min_lat, max_lon, max_lat)
    pub bbox: (f64, f64, f64, f64),
}

impl CountryShape {
    pub fn new(code: Option<String>, name: Option<String>, rings: Vec<Ring>) -> Self {
        let mut bbox = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in rings.iter().flatten() {
            bbox.0 = bbox.0.min(p.x);
            bbox.1 = bbox.1.min(p.y);
            bbox.2 = bbox.2.max(p.x);
            bbox.3 = bbox.3.max(p.y);
        }
        Self { code, name, rings, bbox }
    }

    /// Even-odd point in polygon over all rings
    pub fn contains(&self, p: DVec2) -> bool {
        if p.x < self.bbox.0 || p.x > self.bbox.2 || p.y < self.bbox.1 || p.y > self.bbox.3 {
            return false;
        }
        let mut inside = false;
        for ring in &self.rings {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            let mut j = n - 1;
            for i in 0..n {
                let (a, b) = (ring[i], ring[j]);
                if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                    inside = !inside;
                }
                j = i;
            }
        }
        inside
    }
}

/// Country geometry for the choropleth
#[derive(Debug, Clone, Default)]
pub struct MapOutline {
    pub shapes: Vec<CountryShape>,
}

impl MapOutline {
    pub fn unresolved_count(&self) -> usize {
        self.shapes.iter().filter(|s| s.code.is_none()).count()
    }
}

/// Properties we look at on each feature. Everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct ShapeProperties {
    #[serde(rename = "ISO_A3")]
    iso_a3_upper: Option<String>,
    iso_a3: Option<String>,
    #[serde(rename = "ADM0_A3")]
    adm0_a3_upper: Option<String>,
    adm0_a3: Option<String>,
    name: Option<String>,
    #[serde(rename = "NAME")]
    name_upper: Option<String>,
    #[serde(rename = "ADMIN")]
    admin: Option<String>,
}

impl ShapeProperties {
    fn from_json_object(props: &geojson::JsonObject) -> Self {
        let text = |key: &str| props.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            iso_a3_upper: text("ISO_A3"),
            iso_a3: text("iso_a3"),
            adm0_a3_upper: text("ADM0_A3"),
            adm0_a3: text("adm0_a3"),
            name: text("name"),
            name_upper: text("NAME"),
            admin: text("ADMIN"),
        }
    }

    fn display_name(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.name_upper.clone())
            .or_else(|| self.admin.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureId {
    Number(i64),
    Text(String),
}

/// Resolve a feature to an ISO alpha-3 code. Natural Earth marks some
/// countries (Norway, France) with "-99" in ISO_A3, hence the fallbacks.
fn resolve_code(props: &ShapeProperties, id: Option<&FeatureId>) -> Option<String> {
    let from_props = [
        &props.iso_a3_upper,
        &props.iso_a3,
        &props.adm0_a3_upper,
        &props.adm0_a3,
    ]
    .into_iter()
    .flatten()
    .find(|code| code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()))
    .map(|code| code.to_ascii_uppercase());

    from_props.or_else(|| {
        let alpha3 = match id? {
            FeatureId::Number(n) => u16::try_from(*n).ok().and_then(iso::alpha3_from_numeric),
            FeatureId::Text(s) => iso::alpha3_from_numeric_str(s),
        };
        alpha3.map(str::to_string)
    })
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArcRefs {
    Polygon(Vec<Vec<i64>>),
    MultiPolygon(Vec<Vec<Vec<i64>>>),
}

#[derive(Debug, Deserialize)]
struct TopoGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<FeatureId>,
    #[serde(default)]
    properties: Option<ShapeProperties>,
    #[serde(default)]
    arcs: Option<ArcRefs>,
}

#[derive(Debug, Deserialize)]
struct TopoCollection {
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
}

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    objects: HashMap<String, TopoCollection>,
}

#[derive(Debug, Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Decode quantized, delta-encoded arcs into absolute coordinates
fn decode_arcs(arcs: &[Vec<Vec<f64>>], transform: Option<&Transform>) -> Vec<Vec<DVec2>> {
    arcs.iter()
        .map(|arc| {
            let positions = arc.iter().filter(|p| p.len() >= 2);
            match transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    positions
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            DVec2::new(x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1])
                        })
                        .collect()
                }
                None => positions.map(|p| DVec2::new(p[0], p[1])).collect(),
            }
        })
        .collect()
}

/// Join arcs into one ring. A negative index `!i` means arc `i` reversed;
/// consecutive arcs share their joining point.
fn stitch_ring(arcs: &[Vec<DVec2>], refs: &[i64]) -> Ring {
    let mut ring: Ring = Vec::new();
    for &r in refs {
        let (idx, reversed) = if r < 0 { (!r as usize, true) } else { (r as usize, false) };
        let Some(arc) = arcs.get(idx) else {
            continue;
        };
        let skip = usize::from(!ring.is_empty());
        if reversed {
            ring.extend(arc.iter().rev().skip(skip).copied());
        } else {
            ring.extend(arc.iter().skip(skip).copied());
        }
    }
    ring
}

fn parse_topology(bytes: &mut [u8], path: &Path) -> LoadResult<MapOutline> {
    let topology: Topology = simd_json::serde::from_slice(bytes).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let countries = topology.objects.get("countries").ok_or(LoadError::NoCountries)?;
    let arcs = decode_arcs(&topology.arcs, topology.transform.as_ref());

    let no_props = ShapeProperties::default();
    let mut outline = MapOutline::default();
    for geometry in &countries.geometries {
        let rings: Vec<Ring> = match (geometry.kind.as_str(), &geometry.arcs) {
            ("Polygon", Some(ArcRefs::Polygon(polygon))) => {
                polygon.iter().map(|refs| stitch_ring(&arcs, refs)).collect()
            }
            ("MultiPolygon", Some(ArcRefs::MultiPolygon(polygons))) => polygons
                .iter()
                .flatten()
                .map(|refs| stitch_ring(&arcs, refs))
                .collect(),
            // An empty MultiPolygon deserializes as an empty Polygon
            _ => continue,
        };
        let props = geometry.properties.as_ref().unwrap_or(&no_props);
        outline.shapes.push(CountryShape::new(
            resolve_code(props, geometry.id.as_ref()),
            props.display_name(),
            rings,
        ));
    }
    Ok(outline)
}

fn parse_geojson(bytes: &[u8], path: &Path) -> LoadResult<MapOutline> {
    let geojson_error = |source: geojson::Error| LoadError::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let text = String::from_utf8_lossy(bytes);
    let geojson: GeoJson = text.parse().map_err(geojson_error)?;

    let mut outline = MapOutline::default();
    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => return Err(LoadError::NoCountries),
    };
    for feature in features {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let mut rings = Vec::new();
        collect_rings(geometry, &mut rings);
        if rings.is_empty() {
            continue;
        }
        let props = feature
            .properties
            .as_ref()
            .map(ShapeProperties::from_json_object)
            .unwrap_or_default();
        let id = match &feature.id {
            Some(geojson::feature::Id::String(s)) => Some(FeatureId::Text(s.clone())),
            Some(geojson::feature::Id::Number(n)) => n.as_i64().map(FeatureId::Number),
            None => None,
        };
        outline.shapes.push(CountryShape::new(resolve_code(&props, id.as_ref()), props.display_name(), rings));
    }
    Ok(outline)
}

fn collect_rings(geometry: &Geometry, rings: &mut Vec<Ring>) {
    let to_ring = |coords: &Vec<Vec<f64>>| -> Ring {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| DVec2::new(c[0], c[1]))
            .collect()
    };
    match &geometry.value {
        Value::Polygon(polygon) => rings.extend(polygon.iter().map(to_ring)),
        Value::MultiPolygon(polygons) => rings.extend(polygons.iter().flatten().map(to_ring)),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_rings(g, rings);
            }
        }
        _ => {}
    }
}

/// Parse a TopoJSON topology (`objects.countries`) or a GeoJSON feature collection
pub fn parse_outline(path: &Path, bytes: Vec<u8>) -> LoadResult<MapOutline> {
    // simd-json parses in place, so the probe gets its own copy
    let mut probe_bytes = bytes.clone();
    let probe: TypeProbe = simd_json::serde::from_slice(&mut probe_bytes).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let outline = if probe.kind.as_deref() == Some("Topology") {
        let mut bytes = bytes;
        parse_topology(&mut bytes, path)?
    } else {
        parse_geojson(&bytes, path)?
    };

    if outline.shapes.is_empty() {
        return Err(LoadError::EmptyOutline);
    }
    Ok(outline)
}

/// Read and parse a map outline file
pub fn load_outline(path: &Path) -> LoadResult<MapOutline> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_outline(path, bytes)
}

/// Load the outline on a worker thread, giving up after `timeout`.
/// A slow or broken outline must not hold up the dataset-driven UI.
pub fn load_outline_with_timeout(path: &Path, timeout: Duration) -> LoadResult<MapOutline> {
    let (tx, rx) = mpsc::channel();
    let owned: PathBuf = path.to_path_buf();
    thread::Builder::new()
        .name("outline-loader".into())
        .spawn(move || {
            let _ = tx.send(load_outline(&owned));
        })
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let outline = match rx.recv_timeout(timeout) {
        Ok(result) => result?,
        Err(RecvTimeoutError::Timeout) => return Err(LoadError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => return Err(LoadError::LoaderGone),
    };
    log::info!(
        "loaded map outline {}: {} shapes, {} without a country code",
        path.display(),
        outline.shapes.len(),
        outline.unresolved_count()
    );
    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Two unit squares sharing the arc x=1. Quantized with scale 1.
    const TOPO: &str = r#"{
        "type": "Topology",
        "transform": {"scale": [1, 1], "translate": [0, 0]},
        "arcs": [
            [[1, 0], [0, 1]],
            [[1, 1], [-1, 0], [0, -1], [1, 0]],
            [[1, 0], [1, 0], [0, 1], [-1, 0]]
        ],
        "objects": {
            "countries": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "id": "578", "properties": {"name": "Norway"}, "arcs": [[0, 1]]},
                    {"type": "MultiPolygon", "id": 304, "arcs": [[[2, -1]]]},
                    {"type": "Polygon", "id": "999", "arcs": [[0, 1]]},
                    {"type": "Point", "id": "1"}
                ]
            }
        }
    }"#;

    fn parse(text: &str) -> LoadResult<MapOutline> {
        parse_outline(Path::new("outline.json"), text.as_bytes().to_vec())
    }

    #[test]
    fn test_topology_decodes_shapes() {
        let outline = parse(TOPO).unwrap();
        assert_eq!(outline.shapes.len(), 3);

        let norway = &outline.shapes[0];
        assert_eq!(norway.code.as_deref(), Some("NOR"));
        assert_eq!(norway.name.as_deref(), Some("Norway"));
        assert_eq!(norway.bbox, (0.0, 0.0, 1.0, 1.0));
        assert!(norway.contains(DVec2::new(0.5, 0.5)));
        assert!(!norway.contains(DVec2::new(1.5, 0.5)));

        let greenland = &outline.shapes[1];
        assert_eq!(greenland.code.as_deref(), Some("GRL"));
        assert!(greenland.contains(DVec2::new(1.5, 0.5)));
        assert!(!greenland.contains(DVec2::new(0.5, 0.5)));

        assert_eq!(outline.shapes[2].code, None);
        assert_eq!(outline.unresolved_count(), 1);
    }

    #[test]
    fn test_stitch_reversed_arc() {
        let arcs = vec![
            vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0)],
            vec![DVec2::new(0.0, 1.0), DVec2::new(1.0, 0.0)],
        ];
        let ring = stitch_ring(&arcs, &[0, !1]);
        assert_eq!(ring, vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0)]);
    }

    #[test]
    fn test_topology_without_countries() {
        let text = r#"{"type": "Topology", "arcs": [], "objects": {"land": {"geometries": []}}}"#;
        assert!(matches!(parse(text), Err(LoadError::NoCountries)));
    }

    #[test]
    fn test_geojson_properties_and_fallbacks() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"ISO_A3": "-99", "ADM0_A3": "NOR", "NAME": "Norway"},
                 "geometry": {"type": "Polygon", "coordinates": [[[5,58],[10,58],[10,62],[5,62],[5,58]]]}},
                {"type": "Feature", "properties": {"iso_a3": "jpn"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[130,31],[140,31],[140,40],[130,40],[130,31]]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}}
            ]
        }"#;
        let outline = parse(text).unwrap();
        assert_eq!(outline.shapes.len(), 2);
        assert_eq!(outline.shapes[0].code.as_deref(), Some("NOR"));
        assert_eq!(outline.shapes[0].name.as_deref(), Some("Norway"));
        assert_eq!(outline.shapes[1].code.as_deref(), Some("JPN"));
    }

    #[test]
    fn test_empty_outline_degrades() {
        let text = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(parse(text), Err(LoadError::EmptyOutline)));
    }

    #[test]
    fn test_load_with_timeout_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TOPO.as_bytes()).unwrap();
        let outline = load_outline_with_timeout(file.path(), Duration::from_secs(5)).unwrap();
        assert_eq!(outline.shapes.len(), 3);
    }

    #[test]
    fn test_load_with_timeout_missing_file() {
        let err = load_outline_with_timeout(Path::new("/no/such/outline.json"), Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_with_timeout_gives_up_on_stalled_read() {
        // Opening a FIFO for reading blocks until a writer shows up
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("outline.json");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status().unwrap();
        assert!(status.success());

        let started = std::time::Instant::now();
        let err = load_outline_with_timeout(&fifo, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, LoadError::Timeout(t) if t == Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(err.to_string().contains("did not load within"));
    }
}
