use std::fmt;
use std::ops::ControlFlow;

use tracing::info;

use crate::bounds::{fold_bounds, Bounds};
use crate::error::ParseError;
use crate::options::{Checkpoint, ParseOptions};

pub const DEFAULT_COLOR: [u8; 3] = [128, 128, 128];

/// One decoded point or splat. `position` is always finite.
#[derive(Clone, Debug, PartialEq)]
pub struct PointRecord {
    pub position: [f32; 3],
    pub color: [u8; 3],
    pub normal: Option<[f32; 3]>,
    /// Positive on every axis when present.
    pub scale: Option<[f32; 3]>,
    /// Quaternion (x, y, z, w), components in [-1, 1].
    pub rotation: Option<[f32; 4]>,
    /// In [0, 1].
    pub opacity: Option<f32>,
}

impl PointRecord {
    pub fn new(position: [f32; 3], color: [u8; 3]) -> Self {
        Self {
            position,
            color,
            normal: None,
            scale: None,
            rotation: None,
            opacity: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneFormat {
    Ply,
    Splat,
}

impl SceneFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneFormat::Ply => "ply",
            SceneFormat::Splat => "splat",
        }
    }

    /// Noun used when nothing survives decoding.
    fn record_noun(&self) -> &'static str {
        match self {
            SceneFormat::Ply => "points",
            SceneFormat::Splat => "splats",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub format: SceneFormat,
    /// Number of points actually kept, not the declared count.
    pub vertex_count: usize,
    pub has_normals: bool,
    pub has_colors: bool,
    pub file_size: usize,
    pub file_name: String,
}

/// Result of a successful parse. Fields are private so the invariants
/// established by [`assemble`] hold for the lifetime of the value.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    points: Vec<PointRecord>,
    bounds: Bounds,
    metadata: Metadata,
}

impl Dataset {
    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn into_points(self) -> Vec<PointRecord> {
        self.points
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metadata;
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        let fmt3 = |v: &[f32; 3]| format!("[{:.2}, {:.2}, {:.2}]", v[0], v[1], v[2]);

        writeln!(f, "{}", m.file_name)?;
        writeln!(f, "  Format:      {}", m.format.as_str().to_uppercase())?;
        writeln!(f, "  Size:        {:.2} MB", m.file_size as f64 / 1024.0 / 1024.0)?;
        writeln!(f, "  Points:      {}", self.points.len())?;
        writeln!(f, "  Has Colors:  {}", yes_no(m.has_colors))?;
        writeln!(f, "  Has Normals: {}", yes_no(m.has_normals))?;
        writeln!(f, "  Bounds Min:  {}", fmt3(&self.bounds.min))?;
        write!(f, "  Bounds Max:  {}", fmt3(&self.bounds.max))
    }
}

/// What a decoder knows about its input besides the points themselves.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    pub format: SceneFormat,
    pub has_normals: bool,
    pub has_colors: bool,
    pub file_size: usize,
    pub file_name: String,
}

/// Folds the bounds and builds the final dataset, refusing empty results.
pub fn assemble<F>(
    points: Vec<PointRecord>,
    source: SourceInfo,
    opts: &ParseOptions,
    on_checkpoint: &mut F,
) -> Result<Dataset, ParseError>
where
    F: FnMut(&Checkpoint) -> ControlFlow<()>,
{
    if points.is_empty() {
        return Err(ParseError::EmptyResult {
            what: source.format.record_noun(),
        });
    }

    let bounds = fold_bounds(&points, opts.bounds_batch, on_checkpoint)?;

    let metadata = Metadata {
        format: source.format,
        vertex_count: points.len(),
        has_normals: source.has_normals,
        has_colors: source.has_colors,
        file_size: source.file_size,
        file_name: source.file_name,
    };

    info!(
        format = metadata.format.as_str(),
        points = metadata.vertex_count,
        "scene parsed"
    );

    Ok(Dataset {
        points,
        bounds,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::keep_going;

    fn source(format: SceneFormat) -> SourceInfo {
        SourceInfo {
            format,
            has_normals: false,
            has_colors: true,
            file_size: 3 * 1024 * 1024,
            file_name: "scene.ply".to_string(),
        }
    }

    #[test]
    fn test_assemble_rejects_empty() {
        let err = assemble(Vec::new(), source(SceneFormat::Ply), &ParseOptions::default(), &mut keep_going)
            .unwrap_err();
        assert_eq!(err.to_string(), "no valid points found");

        let err = assemble(Vec::new(), source(SceneFormat::Splat), &ParseOptions::default(), &mut keep_going)
            .unwrap_err();
        assert_eq!(err.to_string(), "no valid splats found");
    }

    #[test]
    fn test_assemble_counts_kept_points() {
        let points = vec![
            PointRecord::new([0.0, 1.0, 2.0], DEFAULT_COLOR),
            PointRecord::new([-1.0, 4.0, 2.5], DEFAULT_COLOR),
        ];
        let ds = assemble(points, source(SceneFormat::Ply), &ParseOptions::default(), &mut keep_going).unwrap();
        assert_eq!(ds.metadata().vertex_count, 2);
        assert_eq!(ds.bounds().min, [-1.0, 1.0, 2.0]);
        assert_eq!(ds.bounds().max, [0.0, 4.0, 2.5]);
    }

    #[test]
    fn test_summary_text() {
        let points = vec![PointRecord::new([1.0, 2.0, 3.0], DEFAULT_COLOR)];
        let ds = assemble(points, source(SceneFormat::Splat), &ParseOptions::default(), &mut keep_going).unwrap();
        let text = ds.summary();
        assert!(text.starts_with("scene.ply\n"));
        assert!(text.contains("Format:      SPLAT"));
        assert!(text.contains("Size:        3.00 MB"));
        assert!(text.contains("Has Normals: No"));
        assert!(text.contains("Bounds Max:  [1.00, 2.00, 3.00]"));
    }
}
