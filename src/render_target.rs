//! Render target objects: the framebuffer pair, optional multisample color
//! storage, and the dirty-region bookkeeping that drives resolves.

use crate::caps::{Caps, MsFboType};
use crate::interface::{FramebufferId, RenderbufferId};
use crate::pixel::PixelConfig;
use crate::rect::{GlRect, Rect, SurfaceOrigin};
use crate::stencil::StencilBuffer;
use crate::texture::TextureHandle;

/// Index into the device's render target registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RenderTargetHandle(pub(crate) usize);

/// How a render target's multisample buffer reaches its resolved texture.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum ResolveType {
    /// Not multisampled with separate storage; nothing to resolve.
    CantResolve,
    /// The platform resolves implicitly on texture read.
    AutoResolves,
    /// An explicit resolve (blit or resolve primitive) is required.
    CanResolve,
}

/// A surface draws render into: an FBO, its optional multisample color
/// storage and resolve FBO, and an optional stencil attachment.
#[derive(Debug)]
pub struct RenderTarget {
    /// FBO draws are issued against.
    pub(crate) draw_fbo: Option<FramebufferId>,
    /// FBO holding the resolved (single-sample) texture; `None` when
    /// `draw_fbo` renders straight into the texture.
    pub(crate) resolve_fbo: Option<FramebufferId>,
    /// Multisample color storage attached to `draw_fbo`, when separate.
    pub(crate) ms_color_renderbuffer: Option<RenderbufferId>,
    pub(crate) sample_count: u32,
    pub(crate) origin: SurfaceOrigin,
    pub(crate) config: PixelConfig,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) stencil: Option<StencilBuffer>,
    /// Region rendered since the last resolve, in top-down coordinates.
    /// `Some` with an empty rect never occurs; `None` means clean.
    pub(crate) dirty_region: Option<Rect>,
    pub(crate) unique_id: u64,
    /// GL objects are deleted on release; false for wrapped targets.
    pub(crate) owned: bool,
    /// Backing texture, absent for wrapped external targets.
    pub(crate) texture: Option<TextureHandle>,
}

impl RenderTarget {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Pixel format.
    #[must_use]
    pub fn config(&self) -> PixelConfig {
        self.config
    }

    /// Row origin of the target's contents.
    #[must_use]
    pub fn origin(&self) -> SurfaceOrigin {
        self.origin
    }

    /// Effective sample count (zero and one both mean single-sampled).
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// The attached stencil buffer, if any.
    #[must_use]
    pub fn stencil(&self) -> Option<&StencilBuffer> {
        self.stencil.as_ref()
    }

    /// Whole-target viewport in GL window coordinates.
    pub(crate) fn viewport(&self) -> GlRect {
        GlRect::from_wh(self.width, self.height)
    }

    pub(crate) fn bounds(&self) -> Rect {
        Rect::from_wh(self.width, self.height)
    }

    pub(crate) fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }

    /// Whether the draw and resolve storage are distinct objects.
    pub(crate) fn has_separate_resolve(&self) -> bool {
        self.ms_color_renderbuffer.is_some()
    }

    pub(crate) fn resolve_type(&self, caps: &Caps) -> ResolveType {
        if !self.is_multisampled() || !self.has_separate_resolve() {
            ResolveType::CantResolve
        } else if caps.ms_fbo_type == MsFboType::AutoResolves {
            ResolveType::AutoResolves
        } else {
            ResolveType::CanResolve
        }
    }

    /// Record that `rect` (or the whole target when `None`) was rendered and
    /// needs resolving before the texture is read. Consecutive regions
    /// coalesce into their union.
    pub(crate) fn flag_needs_resolve(&mut self, rect: Option<&Rect>) {
        if !self.has_separate_resolve() {
            return;
        }
        let mut dirty = match rect {
            Some(r) => match r.intersect(&self.bounds()) {
                Some(clipped) => clipped,
                None => return,
            },
            None => self.bounds(),
        };
        if let Some(prev) = &self.dirty_region {
            dirty = dirty.join(prev);
        }
        self.dirty_region = Some(dirty);
    }

    pub(crate) fn flag_resolved(&mut self) {
        self.dirty_region = None;
    }

    pub(crate) fn needs_resolve(&self) -> bool {
        self.dirty_region.is_some()
    }
}
