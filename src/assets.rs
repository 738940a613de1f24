//! Sprite frame loading.
//!
//! Frames are `<prefix>_<index>.png` files looked up file-by-file across an
//! ordered list of asset roots. The source art faces left; right-facing
//! variants are mirrored at load time. Every frame ends up as one layer of a
//! texture array, premultiplied and scaled to a common size.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::facing::Direction;
use crate::pet::behavior::SetSizes;
use crate::pet::mode::{Activity, FrameRef, FrameSet, InteractionKind};

/// Layer size in pixels: twice the displayed sprite, for crisp downscaling.
pub const FRAME_SIZE: (u32, u32) = (280, 220);

/// Animated sets and how many frames each ships with.
const ANIMATED: &[(FrameSet, &str, usize)] = &[
    (FrameSet::Walking, "cat_walking", 8),
    (FrameSet::Running, "cat_running", 8),
    (FrameSet::Activity(Activity::SitDown), "cat_sitdown", 8),
    (FrameSet::Activity(Activity::Yarn), "cat_yarn", 4),
    (FrameSet::Activity(Activity::Belly), "cat_belly", 4),
    (FrameSet::Activity(Activity::Wave), "cat_wave", 8),
    (FrameSet::Activity(Activity::Front), "cat_front", 8),
];

const SIT_POSE: &str = "cat_sitting";
const JUMP_POSE: &str = "cat_jumping";
const SLEEP_POSE: &str = "cat_sleeping";

fn interaction_pose(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Pet => "cat_being_petted",
        InteractionKind::Scratch => "cat_scratching",
        InteractionKind::Feed => "cat_eating",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no walking frames found (searched {searched:?})")]
    NoWalkingFrames { searched: Vec<PathBuf> },
}

/// Resolves frame names against the asset roots, in order.
#[derive(Debug, Clone)]
pub struct FrameLoader {
    roots: Vec<PathBuf>,
    frame_size: (u32, u32),
}

impl FrameLoader {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            frame_size: FRAME_SIZE,
        }
    }

    /// Default search order: next to the executable, the app bundle's
    /// resources, the source tree, then the working directory.
    pub fn from_environment() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        Self::new(search_roots(exe_dir.as_deref()))
    }

    pub fn with_frame_size(mut self, size: (u32, u32)) -> Self {
        self.frame_size = size;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First root containing `<name>.png`.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let file = format!("{name}.png");
        self.roots
            .iter()
            .map(|root| root.join(&file))
            .find(|path| path.is_file())
    }

    /// Load, scale and premultiply one frame. `Ok(None)` if it doesn't exist.
    pub fn load(&self, name: &str) -> Result<Option<RgbaImage>, AssetError> {
        let Some(path) = self.locate(name) else {
            return Ok(None);
        };
        let reader = image::ImageReader::open(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        let decoded = reader
            .decode()
            .map_err(|source| AssetError::Decode { path, source })?;

        let mut frame = decoded.to_rgba8();
        let (w, h) = self.frame_size;
        if frame.dimensions() != (w, h) {
            frame = imageops::resize(&frame, w, h, FilterType::Lanczos3);
        }
        premultiply(&mut frame);
        Ok(Some(frame))
    }

    /// Frames `<prefix>_0` .. `<prefix>_<count-1>`; missing or broken ones are skipped.
    pub fn load_set(&self, prefix: &str, count: usize) -> Vec<RgbaImage> {
        let frames: Vec<RgbaImage> = (0..count)
            .filter_map(|i| self.load_logged(&format!("{prefix}_{i}")))
            .collect();
        if frames.is_empty() {
            log::warn!("No {prefix} frames found");
        } else {
            log::info!("Loaded {} {} frames", frames.len(), prefix);
        }
        frames
    }

    /// A single pose, as `<name>_0.png` or `<name>.png`.
    pub fn load_pose(&self, name: &str) -> Option<RgbaImage> {
        self.load_logged(&format!("{name}_0"))
            .or_else(|| self.load_logged(name))
    }

    fn load_logged(&self, name: &str) -> Option<RgbaImage> {
        match self.load(name) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("{e}");
                None
            }
        }
    }
}

fn search_roots(exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(dir) = exe_dir {
        roots.push(dir.join("assets"));
        roots.push(dir.join("..").join("Resources").join("Assets"));
    }
    roots.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("assets"));
    roots.push(PathBuf::from("assets"));
    roots
}

/// Premultiply in linear light. The texture is sampled as sRGB, so the
/// shader sees `linear * alpha` after decoding.
fn premultiply(frame: &mut RgbaImage) {
    for px in frame.pixels_mut() {
        let a = px[3];
        if a == u8::MAX {
            continue;
        }
        let alpha = f32::from(a) / 255.0;
        for c in &mut px.0[..3] {
            let linear = srgb_to_linear(f32::from(*c) / 255.0) * alpha;
            *c = (linear_to_srgb(linear) * 255.0).round() as u8;
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Every loaded frame as a texture layer, addressable by frame and facing.
pub struct SpriteCatalog {
    layers: Vec<RgbaImage>,
    index: HashMap<(FrameSet, Direction, usize), u32>,
    sizes: SetSizes,
    frame_size: (u32, u32),
}

impl SpriteCatalog {
    /// Lay out `sets` as texture layers. Symmetric sets get one layer per
    /// frame; the rest get the original (left) plus a mirrored copy (right).
    pub fn build(sets: Vec<(FrameSet, Vec<RgbaImage>)>, frame_size: (u32, u32)) -> Self {
        let mut layers = Vec::new();
        let mut index = HashMap::new();
        let mut sizes = SetSizes::new();

        for (set, frames) in sets {
            if frames.is_empty() {
                continue;
            }
            sizes = sizes.with(set, frames.len());
            for (i, frame) in frames.into_iter().enumerate() {
                let left = layers.len() as u32;
                if set.is_symmetric() {
                    layers.push(frame);
                    index.insert((set, Direction::Left, i), left);
                    index.insert((set, Direction::Right, i), left);
                } else {
                    let mirrored = imageops::flip_horizontal(&frame);
                    layers.push(frame);
                    layers.push(mirrored);
                    index.insert((set, Direction::Left, i), left);
                    index.insert((set, Direction::Right, i), left + 1);
                }
            }
        }

        Self {
            layers,
            index,
            sizes,
            frame_size,
        }
    }

    pub fn layer(&self, frame: FrameRef, facing: Direction) -> Option<u32> {
        self.index.get(&(frame.set, facing, frame.index)).copied()
    }

    pub fn layers(&self) -> &[RgbaImage] {
        &self.layers
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    pub fn sizes(&self) -> &SetSizes {
        &self.sizes
    }

    /// Release the pixel data once it lives on the GPU.
    pub fn drop_pixels(&mut self) {
        self.layers = Vec::new();
    }
}

/// Load every frame set the pet uses.
///
/// Jump and sleep poses fall back to the sitting pose, then to the first
/// walking frame. Only a missing walking set is an error.
pub fn load_catalog(loader: &FrameLoader) -> Result<SpriteCatalog, AssetError> {
    let mut sets: Vec<(FrameSet, Vec<RgbaImage>)> = ANIMATED
        .iter()
        .map(|&(set, prefix, count)| (set, loader.load_set(prefix, count)))
        .collect();

    let walking_first = sets
        .iter()
        .find(|(set, _)| *set == FrameSet::Walking)
        .and_then(|(_, frames)| frames.first().cloned());
    let Some(walking_first) = walking_first else {
        return Err(AssetError::NoWalkingFrames {
            searched: loader.roots().to_vec(),
        });
    };

    let sit = loader.load_pose(SIT_POSE);
    let fallback = sit.clone().unwrap_or(walking_first);
    let jump = loader.load_pose(JUMP_POSE).unwrap_or_else(|| fallback.clone());
    let sleep = loader.load_pose(SLEEP_POSE).unwrap_or(fallback);

    sets.extend(sit.map(|img| (FrameSet::Sit, vec![img])));
    sets.push((FrameSet::Jump, vec![jump]));
    sets.push((FrameSet::Sleep, vec![sleep]));
    for kind in InteractionKind::ALL {
        match loader.load_pose(interaction_pose(kind)) {
            Some(img) => sets.push((FrameSet::Interaction(kind), vec![img])),
            None => log::warn!("No {} pose, that interaction is disabled", kind.label()),
        }
    }

    let catalog = SpriteCatalog::build(sets, loader.frame_size);
    log::info!("Sprite catalog: {} texture layers", catalog.layers().len());
    Ok(catalog)
}
