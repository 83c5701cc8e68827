//! Desired draw state and the device-wide cache of last-flushed GL state.
//!
//! Every cached field is tri-state: a known value, or Unknown, which forces
//! the next flush to re-issue the underlying call. The whole cache drops to
//! Unknown on context-reset events and individual fields drop to Unknown (or
//! to GL's documented implicit value) when resources are deleted.

use crate::interface::{
    BlendCoeff, BufferId, BufferTarget, CullFace, Filter, GlCap, GlInterface, StencilFunc,
    StencilOp, WrapMode,
};
use crate::rect::{GlRect, Rect};
use crate::render_target::RenderTargetHandle;
use crate::texture::TextureHandle;

/// Number of texture units draws may sample from.
pub const NUM_TEXTURE_UNITS: usize = 4;

/// A spare unit used for uploads and copies, so binding for data transfer
/// never disturbs a unit a draw is sampling from.
pub(crate) const SPARE_TEXTURE_UNIT: u32 = NUM_TEXTURE_UNITS as u32;

/// A cached boolean GL toggle: set, unset, or unknown.
///
/// `Unknown` always forces the next flush to issue the call.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum TriState {
    /// State is known to be enabled.
    Yes,
    /// State is known to be disabled.
    No,
    /// State is unknown; must be re-issued.
    #[default]
    Unknown,
}

/// A cached GL state value of arbitrary type.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum Cached<T> {
    /// Value unknown; must be re-issued.
    #[default]
    Unknown,
    /// Last value pushed to the driver.
    Known(T),
}

impl<T: PartialEq> Cached<T> {
    /// Record `value` as the flushed state. Returns whether the caller must
    /// issue the driver call (value changed or was unknown).
    pub(crate) fn set(&mut self, value: T) -> bool {
        if matches!(self, Cached::Known(v) if *v == value) {
            return false;
        }
        *self = Cached::Known(value);
        true
    }
}

/// Stencil state for one face.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StencilSide {
    /// Comparison function.
    pub func: StencilFunc,
    /// Reference value.
    pub reference: u32,
    /// Comparison mask.
    pub func_mask: u32,
    /// Write mask.
    pub write_mask: u32,
    /// Operation on stencil-test failure.
    pub fail_op: StencilOp,
    /// Operation on pass.
    pub pass_op: StencilOp,
}

/// Full two-sided stencil settings for a draw.
///
/// Cached against the previously flushed settings as a whole (struct-level
/// equality), not field-by-field.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StencilSettings {
    /// Front-face state.
    pub front: StencilSide,
    /// Back-face state. Ignored (front is used for both) when the platform
    /// lacks two-sided stencil.
    pub back: StencilSide,
}

/// Sampler parameters for one texture binding.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SamplerState {
    /// Min/mag filter. [`Filter::MipMap`] triggers mip generation when the
    /// texture's mips are stale.
    pub filter: Filter,
    /// Horizontal wrap mode.
    pub wrap_x: WrapMode,
    /// Vertical wrap mode.
    pub wrap_y: WrapMode,
    /// Sample with red and blue swapped (BGRA-as-RGBA compatibility).
    pub swap_red_blue: bool,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            filter: Filter::Nearest,
            wrap_x: WrapMode::Clamp,
            wrap_y: WrapMode::Clamp,
            swap_red_blue: false,
        }
    }
}

/// A texture bound for sampling at one unit.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TextureBinding {
    /// The sampled texture.
    pub texture: TextureHandle,
    /// Its sampler parameters.
    pub sampler: SamplerState,
}

/// Which side triangles are drawn (the other side is culled).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum DrawFace {
    /// Draw both faces; culling disabled.
    #[default]
    Both,
    /// Draw counter-clockwise faces.
    Ccw,
    /// Draw clockwise faces.
    Cw,
}

/// What kind of draw a state flush precedes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DrawType {
    /// Ordinary color draw; the full stencil flush applies.
    Color,
    /// A stencil-path draw that manages stencil state itself; the ordinary
    /// stencil-settings flush is skipped.
    StencilPath,
}

/// The immutable desired state for the next draw.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct DrawState {
    /// Target of the draw.
    pub render_target: RenderTargetHandle,
    /// Scissor rectangle in the target's top-down coordinates; `None`
    /// disables scissoring.
    pub scissor: Option<Rect>,
    /// Source blend coefficient.
    pub src_blend: BlendCoeff,
    /// Destination blend coefficient.
    pub dst_blend: BlendCoeff,
    /// Constant blend color, used only when a coefficient references it.
    pub blend_constant: [f32; 4],
    /// Stencil settings; `None` disables the stencil test.
    pub stencil: Option<StencilSettings>,
    /// Textures sampled by the draw, per unit.
    pub textures: [Option<TextureBinding>; NUM_TEXTURE_UNITS],
    /// Dithering.
    pub dither: bool,
    /// Color channel writes enabled.
    pub color_write: bool,
    /// Face culling.
    pub draw_face: DrawFace,
}

impl DrawState {
    /// A neutral state targeting `render_target`: no scissor, no blending,
    /// no stencil, no textures.
    #[must_use]
    pub fn new(render_target: RenderTargetHandle) -> Self {
        Self {
            render_target,
            scissor: None,
            src_blend: BlendCoeff::One,
            dst_blend: BlendCoeff::Zero,
            blend_constant: [0.0; 4],
            stencil: None,
            textures: [None; NUM_TEXTURE_UNITS],
            dither: false,
            color_write: true,
            draw_face: DrawFace::Both,
        }
    }
}

/// Last-flushed GL state, one instance per context.
#[derive(Debug, Default)]
pub(crate) struct HwState {
    pub(crate) scissor_enabled: TriState,
    pub(crate) scissor_rect: Cached<GlRect>,
    pub(crate) viewport: Cached<GlRect>,
    pub(crate) blend_enabled: TriState,
    pub(crate) blend_coeffs: Cached<(BlendCoeff, BlendCoeff)>,
    pub(crate) blend_constant: Cached<[f32; 4]>,
    /// Whole-struct cache; `Known(None)` is "stencil test known disabled".
    pub(crate) stencil: Cached<Option<StencilSettings>>,
    pub(crate) dither: TriState,
    pub(crate) color_write: TriState,
    pub(crate) draw_face: Cached<DrawFace>,
    /// Unique id of the render target whose framebuffer is bound for draw.
    pub(crate) bound_render_target: Cached<u64>,
    /// Unique id of the texture bound per unit (the spare unit included).
    pub(crate) bound_textures: [Cached<u64>; NUM_TEXTURE_UNITS + 1],
    pub(crate) active_unit: Cached<u32>,
    pub(crate) bound_vertex_buffer: Cached<Option<BufferId>>,
    pub(crate) bound_index_buffer: Cached<Option<BufferId>>,
    /// Bumped on every wholesale invalidation; per-texture parameter
    /// snapshots older than this are entirely stale.
    pub(crate) reset_timestamp: u64,
}

impl HwState {
    /// Forget everything. Next flush re-issues all state and all texture
    /// parameters.
    pub(crate) fn invalidate(&mut self) {
        let timestamp = self.reset_timestamp + 1;
        *self = Self::default();
        self.reset_timestamp = timestamp;
    }

    /// The bound draw framebuffer is no longer what the cache says (resolve
    /// and copy paths bind framebuffers behind its back).
    pub(crate) fn dirty_render_target(&mut self) {
        self.bound_render_target = Cached::Unknown;
    }

    /// Issue `glEnable`/`glDisable` only when the cached state differs.
    pub(crate) fn set_enabled(&mut self, gl: &mut dyn GlInterface, cap: GlCap, want: bool) {
        let field = match cap {
            GlCap::ScissorTest => &mut self.scissor_enabled,
            GlCap::Blend => &mut self.blend_enabled,
            GlCap::Dither => &mut self.dither,
            // Stencil enable rides on the settings cache and culling on the
            // draw-face cache; their call sites issue the toggles directly.
            GlCap::StencilTest | GlCap::CullFace => {
                debug_assert!(false, "cap is tracked by a dedicated cache");
                return;
            }
        };
        let desired = if want { TriState::Yes } else { TriState::No };
        if *field != desired {
            if want {
                gl.enable(cap);
            } else {
                gl.disable(cap);
            }
            *field = desired;
        }
    }

    /// Bind a vertex/index buffer through the cache. Pack/unpack targets are
    /// not cached and always issue the bind.
    pub(crate) fn bind_buffer(
        &mut self,
        gl: &mut dyn GlInterface,
        target: BufferTarget,
        id: Option<BufferId>,
    ) {
        let cache = match target {
            BufferTarget::Vertex => &mut self.bound_vertex_buffer,
            BufferTarget::Index => &mut self.bound_index_buffer,
            BufferTarget::PixelPack | BufferTarget::PixelUnpack => {
                gl.bind_buffer(target, id);
                return;
            }
        };
        if cache.set(id) {
            gl.bind_buffer(target, id);
        }
    }

    /// Deleting a bound buffer does an implicit bind to zero.
    pub(crate) fn notify_buffer_deleted(&mut self, target: BufferTarget, id: BufferId) {
        let cache = match target {
            BufferTarget::Vertex => &mut self.bound_vertex_buffer,
            BufferTarget::Index => &mut self.bound_index_buffer,
            BufferTarget::PixelPack | BufferTarget::PixelUnpack => return,
        };
        if *cache == Cached::Known(Some(id)) {
            *cache = Cached::Known(None);
        }
    }

    /// Switch the active texture unit through the cache.
    pub(crate) fn set_active_unit(&mut self, gl: &mut dyn GlInterface, unit: u32) {
        if self.active_unit.set(unit) {
            gl.active_texture(unit);
        }
    }

    /// Deleting a bound texture does an implicit bind to zero on every unit
    /// it was bound to.
    pub(crate) fn notify_texture_deleted(&mut self, unique_id: u64) {
        for slot in &mut self.bound_textures {
            if *slot == Cached::Known(unique_id) {
                *slot = Cached::Unknown;
            }
        }
    }

    /// Deleting the bound render target leaves the framebuffer binding
    /// undefined.
    pub(crate) fn notify_render_target_deleted(&mut self, unique_id: u64) {
        if self.bound_render_target == Cached::Known(unique_id) {
            self.bound_render_target = Cached::Unknown;
        }
    }
}
