//! Texture objects and their cached GL parameter snapshots.

use crate::interface::{Channel, Filter, TextureId, WrapMode};
use crate::pixel::PixelConfig;
use crate::rect::SurfaceOrigin;
use crate::render_target::RenderTargetHandle;

/// Index into the device's texture registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TextureHandle(pub(crate) usize);

/// Creation-time description of a texture.
#[derive(Copy, Clone, Debug)]
pub struct TextureDesc {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Pixel format.
    pub config: PixelConfig,
    /// Samples for the attached render target. Zero or one means no
    /// multisampling; ignored unless `render_target` is set.
    pub sample_count: u32,
    /// Also create a render target backed by this texture.
    pub render_target: bool,
}

/// GL texture parameters last pushed for one texture, valid only while the
/// snapshot's timestamp is current (older snapshots predate a context state
/// reset and are entirely stale).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct TexParams {
    pub(crate) filter: Filter,
    pub(crate) wrap_s: WrapMode,
    pub(crate) wrap_t: WrapMode,
    pub(crate) swizzle: [Channel; 4],
}

impl TexParams {
    pub(crate) const IDENTITY_SWIZZLE: [Channel; 4] =
        [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];

    /// The parameters texture creation pushes explicitly (GL's own defaults
    /// differ, so they are never trusted).
    pub(crate) fn initial() -> Self {
        Self {
            filter: Filter::Nearest,
            wrap_s: WrapMode::Clamp,
            wrap_t: WrapMode::Clamp,
            swizzle: Self::IDENTITY_SWIZZLE,
        }
    }
}

/// A device-owned (or wrapped) GL texture.
#[derive(Debug)]
pub struct Texture {
    pub(crate) id: Option<TextureId>,
    pub(crate) wrapped: bool,
    pub(crate) desc: TextureDesc,
    pub(crate) origin: SurfaceOrigin,
    /// Identity for binding caches. Never reused, unlike GL names.
    pub(crate) unique_id: u64,
    pub(crate) cached_params: TexParams,
    /// `HwState::reset_timestamp` at the time `cached_params` was recorded.
    pub(crate) params_timestamp: u64,
    /// Level 0 has changed since mips were last generated.
    pub(crate) mips_dirty: bool,
    pub(crate) render_target: Option<RenderTargetHandle>,
}

impl Texture {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.desc.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.desc.height
    }

    /// Pixel format.
    #[must_use]
    pub fn config(&self) -> PixelConfig {
        self.desc.config
    }

    /// Row origin of the texture's contents.
    #[must_use]
    pub fn origin(&self) -> SurfaceOrigin {
        self.origin
    }

    /// GL name, `None` once released or abandoned.
    #[must_use]
    pub fn gl_id(&self) -> Option<TextureId> {
        self.id
    }

    /// The render target drawing into this texture, when one was created.
    #[must_use]
    pub fn render_target(&self) -> Option<RenderTargetHandle> {
        self.render_target
    }
}
