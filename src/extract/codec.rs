//! Raster encoding helpers
//!
//! PNG bytes for the recognition service and `data:image/png;base64,...`
//! URLs for document snapshots.

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbaImage};

use super::ExtractError;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a raster as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExtractError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Decode any supported image format into RGBA
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, ExtractError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Encode a raster as a PNG data URL
pub fn to_data_url(image: &RgbaImage) -> Result<String, ExtractError> {
    let png = encode_png(image)?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png)))
}

/// Decode a base64 data URL (any image media type)
pub fn from_data_url(url: &str) -> Result<RgbaImage, ExtractError> {
    let payload = match url.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") && header.ends_with(";base64") => payload,
        _ => return Err(ExtractError::InvalidDataUrl),
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| ExtractError::InvalidDataUrl)?;
    decode_image(&bytes)
}

/// Serde adapter storing a shared raster as a PNG data URL
pub mod data_url {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(image: &Arc<RgbaImage>, serializer: S) -> Result<S::Ok, S::Error> {
        let url = to_data_url(image).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&url)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<RgbaImage>, D::Error> {
        let url = String::deserialize(deserializer)?;
        from_data_url(&url).map(Arc::new).map_err(de::Error::custom)
    }
}
