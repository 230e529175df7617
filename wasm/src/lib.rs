pub mod bounds;
pub mod cursor;
pub mod dataset;
pub mod error;
pub mod header;
pub mod layout;
pub mod options;
pub mod ply;
pub mod splat;
pub mod upload;

#[cfg(target_arch = "wasm32")]
mod scene_wasm;

pub use bounds::Bounds;
pub use dataset::{Dataset, Metadata, PointRecord, SceneFormat};
pub use error::{FormatError, ParseError};
pub use header::{PlyEncoding, PlyHeader, Property, PropertyType};
pub use options::{Checkpoint, ParseOptions, Stage};
pub use ply::{parse_ply_core, parse_ply_core_with_opts};
pub use splat::{parse_splat_core, parse_splat_core_with_opts};
pub use upload::{load_scene, load_scene_file, load_scene_with_opts, LoadError, UploadLimits};

#[cfg(target_arch = "wasm32")]
pub use scene_wasm::{parse_ply, parse_scene, parse_splat, SceneData};
