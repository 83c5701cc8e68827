//! Platform capability snapshot.
//!
//! Capabilities are discovered once per context by the embedder (from the GL
//! version and extension strings) and treated as read-only from then on. The
//! device branches on these instead of per-backend subclassing.

use crate::buffer::BufferUpdatePolicy;
use crate::stencil::StencilFormatKind;

/// Which flavor of GL the context speaks.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GlBinding {
    /// Desktop OpenGL.
    Desktop,
    /// OpenGL ES.
    Es,
}

/// Buffer mapping support.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MapBufferType {
    /// No mapping; callers must fall back to `update_data`.
    None,
    /// `glMapBufferRange` is available.
    MapBufferRange,
}

/// How (and whether) the platform exposes multisampled framebuffers and
/// their resolve primitive.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MsFboType {
    /// No multisampled framebuffer support.
    None,
    /// Separate multisample renderbuffer, resolved with a framebuffer blit
    /// that ignores the scissor.
    Standard,
    /// Like `Standard`, but the platform's blit honors the scissor, so it
    /// must be disabled around resolves (EXT-style desktop extension).
    ScissoredBlit,
    /// Only a whole-framebuffer resolve primitive exists; the resolve region
    /// is constrained via the scissor (Apple-style ES extension).
    ResolvePrimitive,
    /// The multisample buffer resolves implicitly when the texture is read;
    /// no explicit resolve calls are ever issued.
    AutoResolves,
}

/// Read-only platform capability flags consumed throughout the device.
#[derive(Clone, Debug)]
pub struct Caps {
    /// Desktop or ES context.
    pub binding: GlBinding,
    /// Buffer mapping support.
    pub map_buffer_type: MapBufferType,
    /// Multisample framebuffer flavor.
    pub ms_fbo_type: MsFboType,
    /// `GL_PACK_ROW_LENGTH` support for readback.
    pub pack_row_length: bool,
    /// `GL_PACK_REVERSE_ROW_ORDER` support (native flip-on-read).
    pub pack_flip_y: bool,
    /// `GL_UNPACK_ROW_LENGTH` support for upload.
    pub unpack_row_length: bool,
    /// Native flip-on-upload support.
    pub unpack_flip_y: bool,
    /// Immutable texture storage (`glTexStorage2D`).
    pub tex_storage: bool,
    /// BGRA textures supported at all.
    pub bgra: bool,
    /// BGRA is an internal format (ES extension flavor) rather than only an
    /// external one.
    pub bgra_is_internal_format: bool,
    /// Separate front/back stencil state.
    pub two_sided_stencil: bool,
    /// Texture channel swizzle parameters.
    pub texture_swizzle: bool,
    /// Single-channel red textures (otherwise alpha-only data uses the
    /// legacy alpha format).
    pub texture_red: bool,
    /// Largest supported texture dimension.
    pub max_texture_size: i32,
    /// Largest supported render target dimension.
    pub max_render_target_size: i32,
    /// Largest supported sample count; requests are clamped to this.
    pub max_sample_count: u32,
    /// Candidate stencil formats in preference order.
    pub stencil_formats: Vec<StencilFormatKind>,
    /// Whether allocating calls are verified with a `glGetError` check.
    /// Platforms with a cheap error query set this; others assume success.
    pub check_alloc_with_get_error: bool,
    /// Keep dynamic vertex/index data in CPU memory instead of buffer
    /// objects (tile-deferred architectures where buffer renaming hurts).
    pub use_cpu_shadow_for_dynamic_buffers: bool,
    /// Pixel pack/unpack (transfer) buffer support.
    pub transfer_buffers: bool,
    /// `glInvalidateFramebuffer` support for `discard`.
    pub discard_framebuffer: bool,
    /// Strategy for partial buffer updates; see [`BufferUpdatePolicy`].
    pub buffer_update_policy: BufferUpdatePolicy,
}

impl Caps {
    /// Whether buffers can be mapped at all.
    #[must_use]
    pub fn can_map_buffers(&self) -> bool {
        self.map_buffer_type != MapBufferType::None
    }

    #[cfg(test)]
    pub(crate) fn default_with_mapping() -> Self {
        Self {
            map_buffer_type: MapBufferType::MapBufferRange,
            ..Self::default()
        }
    }
}

impl Default for Caps {
    /// A conservative ES2-era baseline: no mapping, no row-length controls,
    /// standard blit-based MSAA, sized stencil formats only.
    fn default() -> Self {
        Self {
            binding: GlBinding::Es,
            map_buffer_type: MapBufferType::None,
            ms_fbo_type: MsFboType::Standard,
            pack_row_length: false,
            pack_flip_y: false,
            unpack_row_length: false,
            unpack_flip_y: false,
            tex_storage: false,
            bgra: false,
            bgra_is_internal_format: false,
            two_sided_stencil: false,
            texture_swizzle: false,
            texture_red: false,
            max_texture_size: 4096,
            max_render_target_size: 4096,
            max_sample_count: 4,
            stencil_formats: vec![
                StencilFormatKind::Stencil8,
                StencilFormatKind::Depth24Stencil8,
                StencilFormatKind::Stencil16,
            ],
            check_alloc_with_get_error: true,
            use_cpu_shadow_for_dynamic_buffers: false,
            transfer_buffers: false,
            discard_framebuffer: false,
            buffer_update_policy: BufferUpdatePolicy::OrphanThenSubData,
        }
    }
}
