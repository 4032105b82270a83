//! Image preprocessing: decode raw bytes into a normalized NCHW tensor.
//!
//! The geometric transform and normalization statistics depend on the model
//! family. ResNet-152 uses the classic ImageNet recipe (shorter side to 256,
//! center crop 224, ImageNet mean/std); ViT resizes straight to 224×224 and
//! normalizes with uniform 0.5 statistics.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use percept_core::{ModelFamily, PredictError};

/// Side length of the network input, both families.
pub const INPUT_SIZE: u32 = 224;

/// Shorter-side target for the ResNet resize step.
const RESNET_RESIZE: u32 = 256;

/// Per-channel normalization statistics for a family.
fn normalization(family: ModelFamily) -> (&'static [f32; 3], &'static [f32; 3]) {
    const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
    const UNIFORM: [f32; 3] = [0.5, 0.5, 0.5];

    match family {
        ModelFamily::ResNet152 => (&IMAGENET_MEAN, &IMAGENET_STD),
        ModelFamily::Vit => (&UNIFORM, &UNIFORM),
    }
}

/// A preprocessed image tensor in NCHW layout, f32, shape `(1, 3, 224, 224)`.
///
/// Transient: built per request and consumed by a single inference call.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub data: Vec<f32>,
    pub shape: [usize; 4],
}

/// Decode image bytes and apply the family-specific transform.
///
/// Accepts any codec the `image` crate can sniff; all color modes
/// (grayscale, RGBA, palette) are coerced to RGB. Pure function of
/// `(bytes, family)`. Undecodable bytes yield [`PredictError::Decode`].
pub fn preprocess(bytes: &[u8], family: ModelFamily) -> Result<PreprocessedImage, PredictError> {
    let img = image::load_from_memory(bytes).map_err(|e| PredictError::Decode(e.to_string()))?;

    let sized = match family {
        ModelFamily::ResNet152 => resize_and_center_crop(&img),
        ModelFamily::Vit => img.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle),
    };

    let rgb = sized.to_rgb8();
    debug_assert_eq!(rgb.dimensions(), (INPUT_SIZE, INPUT_SIZE));

    let (mean, std) = normalization(family);
    let side = INPUT_SIZE as usize;
    let plane = side * side;

    // HWC u8 → NCHW f32, scaled to [0,1] then normalized per channel.
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = y as usize * side + x as usize;
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            data[c * plane + offset] = (v - mean[c]) / std[c];
        }
    }

    Ok(PreprocessedImage {
        data,
        shape: [1, 3, side, side],
    })
}

/// Isotropic resize to shorter side [`RESNET_RESIZE`], then center-crop to
/// [`INPUT_SIZE`] square.
fn resize_and_center_crop(img: &DynamicImage) -> DynamicImage {
    let (w, h) = img.dimensions();
    let (nw, nh) = if w <= h {
        let scaled = (h as f64 * RESNET_RESIZE as f64 / w as f64).round() as u32;
        (RESNET_RESIZE, scaled.max(RESNET_RESIZE))
    } else {
        let scaled = (w as f64 * RESNET_RESIZE as f64 / h as f64).round() as u32;
        (scaled.max(RESNET_RESIZE), RESNET_RESIZE)
    };

    let resized = img.resize_exact(nw, nh, FilterType::Triangle);
    resized.crop_imm(
        (nw - INPUT_SIZE) / 2,
        (nh - INPUT_SIZE) / 2,
        INPUT_SIZE,
        INPUT_SIZE,
    )
}
