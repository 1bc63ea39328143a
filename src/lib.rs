//! by16 - fast 16-bucket palette extraction
//!
//! Reduces a decoded pixel buffer to at most 16 [`Cluster`]s in one pass.
//! See [`quantize`] for the bucketing rule and sampling policy.

pub mod cluster;
pub mod error;
pub mod quantize;

use js_sys::{Array, Object, Reflect, Uint8ClampedArray};
use wasm_bindgen::prelude::*;

pub use cluster::{CODE_MASK, Cluster, PLUS_FLAG};
pub use error::{QuantizeError, QuantizeResult};
pub use quantize::{
    Channel, DEFAULT_PIXEL_STRIDE, DEFAULT_SAMPLE_BUDGET, QuantizeOptions, bucket_id, by16,
    quantize, quantize_image,
};

/// JavaScript entry point.
///
/// Takes the raw channel bytes (e.g. `ImageData.data`), an optional number of
/// channels per pixel (default 4) and an optional sampling step (derived from
/// the buffer length when omitted). Returns an array of
/// `{ id, code, area, bytes }` objects, `bytes` being a `Uint8ClampedArray`.
#[wasm_bindgen(js_name = by16)]
pub fn by16_js(bytes: Vec<u8>, pxsize: Option<usize>, step: Option<f64>) -> Result<Array, JsValue> {
    let options = QuantizeOptions {
        pixel_stride: pxsize.unwrap_or(DEFAULT_PIXEL_STRIDE),
        step,
    };
    let clusters =
        quantize(&bytes, &options).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = Array::new();
    for c in &clusters {
        let obj = Object::new();
        Reflect::set(&obj, &JsValue::from_str("id"), &JsValue::from(c.id))?;
        Reflect::set(&obj, &JsValue::from_str("code"), &JsValue::from(c.code))?;
        Reflect::set(&obj, &JsValue::from_str("area"), &JsValue::from_f64(c.area))?;
        Reflect::set(
            &obj,
            &JsValue::from_str("bytes"),
            &Uint8ClampedArray::from(&c.bytes[..]),
        )?;
        result.push(&obj);
    }

    Ok(result)
}
