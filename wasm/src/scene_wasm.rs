use wasm_bindgen::prelude::*;

use crate::dataset::Dataset;
use crate::ply::parse_ply_core;
use crate::splat::parse_splat_core;
use crate::upload::load_scene;

/// Flattened, typed-array friendly view of a [`Dataset`].
#[wasm_bindgen]
pub struct SceneData {
    format: &'static str,
    file_name: String,
    file_size: usize,
    has_normals: bool,
    has_colors: bool,
    positions: Box<[f32]>, // 3N
    colors: Box<[u8]>,     // 3N
    normals: Box<[f32]>,   // 3N, zero when absent
    scales: Box<[f32]>,    // 3N, zero when absent
    rotations: Box<[f32]>, // 4N, identity when absent
    opacities: Box<[f32]>, // N, one when absent
    bbox_min: [f32; 3],
    bbox_max: [f32; 3],
}

impl From<Dataset> for SceneData {
    fn from(ds: Dataset) -> Self {
        let bounds = *ds.bounds();
        let meta = ds.metadata().clone();
        let points = ds.into_points();
        let n = points.len();

        let mut positions = Vec::with_capacity(n * 3);
        let mut colors = Vec::with_capacity(n * 3);
        let mut normals = Vec::with_capacity(n * 3);
        let mut scales = Vec::with_capacity(n * 3);
        let mut rotations = Vec::with_capacity(n * 4);
        let mut opacities = Vec::with_capacity(n);
        for p in &points {
            positions.extend_from_slice(&p.position);
            colors.extend_from_slice(&p.color);
            normals.extend_from_slice(&p.normal.unwrap_or([0.0; 3]));
            scales.extend_from_slice(&p.scale.unwrap_or([0.0; 3]));
            rotations.extend_from_slice(&p.rotation.unwrap_or([0.0, 0.0, 0.0, 1.0]));
            opacities.push(p.opacity.unwrap_or(1.0));
        }

        Self {
            format: meta.format.as_str(),
            file_name: meta.file_name,
            file_size: meta.file_size,
            has_normals: meta.has_normals,
            has_colors: meta.has_colors,
            positions: positions.into_boxed_slice(),
            colors: colors.into_boxed_slice(),
            normals: normals.into_boxed_slice(),
            scales: scales.into_boxed_slice(),
            rotations: rotations.into_boxed_slice(),
            opacities: opacities.into_boxed_slice(),
            bbox_min: bounds.min,
            bbox_max: bounds.max,
        }
    }
}

#[wasm_bindgen]
impl SceneData {
    #[wasm_bindgen(getter)]
    pub fn count(&self) -> u32 {
        self.opacities.len() as u32
    }

    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        self.format.to_string()
    }

    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    #[wasm_bindgen(getter, js_name = fileSize)]
    pub fn file_size(&self) -> f64 {
        self.file_size as f64
    }

    #[wasm_bindgen(getter, js_name = hasNormals)]
    pub fn has_normals(&self) -> bool {
        self.has_normals
    }

    #[wasm_bindgen(getter, js_name = hasColors)]
    pub fn has_colors(&self) -> bool {
        self.has_colors
    }

    #[wasm_bindgen(getter)]
    pub fn positions(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.positions) }
    }

    #[wasm_bindgen(getter)]
    pub fn colors(&self) -> js_sys::Uint8Array {
        unsafe { js_sys::Uint8Array::view(&self.colors) }
    }

    #[wasm_bindgen(getter)]
    pub fn normals(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.normals) }
    }

    #[wasm_bindgen(getter)]
    pub fn scales(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.scales) }
    }

    #[wasm_bindgen(getter)]
    pub fn rotations(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.rotations) }
    }

    #[wasm_bindgen(getter)]
    pub fn opacities(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.opacities) }
    }

    #[wasm_bindgen(getter, js_name = bboxMin)]
    pub fn bbox_min(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.bbox_min) }
    }

    #[wasm_bindgen(getter, js_name = bboxMax)]
    pub fn bbox_max(&self) -> js_sys::Float32Array {
        unsafe { js_sys::Float32Array::view(&self.bbox_max) }
    }
}

#[wasm_bindgen]
pub fn parse_ply(bytes: &[u8], file_name: &str, file_size: f64) -> Result<SceneData, JsValue> {
    let ds = parse_ply_core(bytes, file_name, file_size as usize).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(ds.into())
}

#[wasm_bindgen]
pub fn parse_splat(bytes: &[u8], file_name: &str, file_size: f64) -> Result<SceneData, JsValue> {
    let ds = parse_splat_core(bytes, file_name, file_size as usize).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(ds.into())
}

/// Validates the upload and picks the decoder from the file extension.
#[wasm_bindgen]
pub fn parse_scene(bytes: &[u8], file_name: &str) -> Result<SceneData, JsValue> {
    let ds = load_scene(bytes, file_name).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(ds.into())
}
