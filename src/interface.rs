//! The raw driver call interface: a typed, thin pass-through to the
//! underlying GL entry points the device issues.
//!
//! The device core is written entirely against [`GlInterface`] so that the
//! real backend ([`GlowInterface`](crate::glow_backend::GlowInterface)) and
//! the recording test double are interchangeable. The trait does not redefine
//! GL semantics; every method corresponds to one GL call (or one call per
//! face for the stencil entry points).

use std::num::NonZeroU32;
use std::ptr::NonNull;

use crate::pixel::PixelConfig;
use crate::rect::GlRect;
use crate::stencil::StencilFormatKind;

/// GL buffer object name. GL reserves name zero, so the niche is free.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BufferId(pub NonZeroU32);

/// GL texture object name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct TextureId(pub NonZeroU32);

/// GL renderbuffer object name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RenderbufferId(pub NonZeroU32);

/// GL framebuffer object name.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FramebufferId(pub NonZeroU32);

/// Which buffer binding point a buffer call targets.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BufferTarget {
    /// `GL_ARRAY_BUFFER`.
    Vertex,
    /// `GL_ELEMENT_ARRAY_BUFFER`.
    Index,
    /// `GL_PIXEL_PACK_BUFFER` (GPU → CPU transfer).
    PixelPack,
    /// `GL_PIXEL_UNPACK_BUFFER` (CPU → GPU transfer).
    PixelUnpack,
}

/// Usage hint passed to buffer allocation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BufferUsageHint {
    /// `GL_STATIC_DRAW`.
    StaticDraw,
    /// `GL_DYNAMIC_DRAW`.
    DynamicDraw,
    /// `GL_STREAM_DRAW`.
    StreamDraw,
    /// `GL_STREAM_READ`.
    StreamRead,
}

/// Access mode for a buffer map.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MapAccess {
    /// Read-only mapping.
    Read,
    /// Write mapping that preserves existing contents.
    Write,
    /// Write mapping that may invalidate the previous contents.
    WriteDiscard,
}

/// Framebuffer binding point.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FboTarget {
    /// `GL_FRAMEBUFFER` (both read and draw).
    Both,
    /// `GL_READ_FRAMEBUFFER`.
    Read,
    /// `GL_DRAW_FRAMEBUFFER`.
    Draw,
}

/// Framebuffer attachment point.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Attachment {
    /// `GL_COLOR_ATTACHMENT0`.
    Color,
    /// `GL_STENCIL_ATTACHMENT`.
    Stencil,
    /// `GL_DEPTH_ATTACHMENT`.
    Depth,
}

/// Renderbuffer storage format.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RenderbufferFormat {
    /// Color storage matching a pixel config (multisample color buffers).
    Color(PixelConfig),
    /// Stencil (or packed depth-stencil) storage.
    Stencil(StencilFormatKind),
}

/// Server-side capabilities toggled with `glEnable`/`glDisable`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GlCap {
    /// `GL_SCISSOR_TEST`.
    ScissorTest,
    /// `GL_STENCIL_TEST`.
    StencilTest,
    /// `GL_BLEND`.
    Blend,
    /// `GL_DITHER`.
    Dither,
    /// `GL_CULL_FACE`.
    CullFace,
}

/// Which facing triangles are culled.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CullFace {
    /// `GL_FRONT`.
    Front,
    /// `GL_BACK`.
    Back,
}

/// Blend coefficient, in GL's nomenclature.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs)] // names mirror the GL tokens one-to-one
pub enum BlendCoeff {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    DstColor,
    InvDstColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    ConstColor,
    InvConstColor,
    ConstAlpha,
    InvConstAlpha,
}

impl BlendCoeff {
    /// Whether the coefficient reads the constant blend color register.
    #[must_use]
    pub fn references_constant(self) -> bool {
        matches!(
            self,
            Self::ConstColor | Self::InvConstColor | Self::ConstAlpha | Self::InvConstAlpha
        )
    }
}

/// Stencil face selector for separate front/back calls. `None` means the
/// combined (non-separate) call.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StencilFace {
    /// `GL_FRONT`.
    Front,
    /// `GL_BACK`.
    Back,
}

/// Stencil comparison function.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs)] // names mirror the GL tokens one-to-one
pub enum StencilFunc {
    Always,
    Never,
    Greater,
    GEqual,
    Less,
    LEqual,
    Equal,
    NotEqual,
}

/// Stencil update operation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs)] // names mirror the GL tokens one-to-one
pub enum StencilOp {
    Keep,
    Replace,
    IncWrap,
    IncClamp,
    DecWrap,
    DecClamp,
    Zero,
    Invert,
}

/// Drawn primitive topology.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs)] // names mirror the GL tokens one-to-one
pub enum Primitive {
    Triangles,
    TriangleStrip,
    TriangleFan,
    Points,
    Lines,
    LineStrip,
}

/// Minification/magnification filter for a texture parameter call.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Filter {
    /// `GL_NEAREST`.
    Nearest,
    /// `GL_LINEAR`.
    Bilinear,
    /// `GL_LINEAR_MIPMAP_LINEAR` minification (trilinear).
    MipMap,
}

/// Texture coordinate wrap mode.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WrapMode {
    /// `GL_CLAMP_TO_EDGE`.
    Clamp,
    /// `GL_REPEAT`.
    Repeat,
    /// `GL_MIRRORED_REPEAT`.
    MirrorRepeat,
}

/// Texture wrap axis.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WrapAxis {
    /// `GL_TEXTURE_WRAP_S`.
    S,
    /// `GL_TEXTURE_WRAP_T`.
    T,
}

/// Source channel for a swizzle slot. `Zero` and `One` are the constant
/// sources GL allows alongside the four channels.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[allow(missing_docs)] // names mirror the GL tokens one-to-one
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
    Zero,
    One,
}

/// A GL error code drained from the error queue. `get_error` returning
/// `None` corresponds to `GL_NO_ERROR`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GlErrorCode {
    /// `GL_OUT_OF_MEMORY` — the interesting one for allocation checks.
    OutOfMemory,
    /// `GL_INVALID_ENUM`.
    InvalidEnum,
    /// `GL_INVALID_VALUE`.
    InvalidValue,
    /// `GL_INVALID_OPERATION`.
    InvalidOperation,
    /// Anything else.
    Unknown,
}

/// The raw GL call surface the device issues.
///
/// Implementations must not add caching or reordering of their own; the
/// device's state cache assumes one trait call is one driver call issued in
/// program order. Object-creation methods return `None` when the driver
/// hands back name zero.
pub trait GlInterface {
    /// Drain one error from the GL error queue.
    fn get_error(&mut self) -> Option<GlErrorCode>;

    // Buffer objects.

    /// `glGenBuffers(1, ..)`.
    fn gen_buffer(&mut self) -> Option<BufferId>;
    /// `glDeleteBuffers(1, ..)`.
    fn delete_buffer(&mut self, id: BufferId);
    /// `glBindBuffer`.
    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>);
    /// `glBufferData`. `data: None` allocates (or orphans) uninitialized
    /// storage of `size` bytes.
    fn buffer_data(
        &mut self,
        target: BufferTarget,
        size: usize,
        data: Option<&[u8]>,
        usage: BufferUsageHint,
    );
    /// `glBufferSubData`.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);
    /// `glMapBufferRange`. Returns `None` on mapping failure.
    fn map_buffer_range(
        &mut self,
        target: BufferTarget,
        offset: usize,
        len: usize,
        access: MapAccess,
    ) -> Option<NonNull<u8>>;
    /// `glUnmapBuffer`. A `false` return means the storage was corrupted
    /// while mapped.
    fn unmap_buffer(&mut self, target: BufferTarget) -> bool;

    // Texture objects.

    /// `glGenTextures(1, ..)`.
    fn gen_texture(&mut self) -> Option<TextureId>;
    /// `glDeleteTextures(1, ..)`.
    fn delete_texture(&mut self, id: TextureId);
    /// `glActiveTexture(GL_TEXTURE0 + unit)`.
    fn active_texture(&mut self, unit: u32);
    /// `glBindTexture(GL_TEXTURE_2D, ..)` on the active unit.
    fn bind_texture(&mut self, id: Option<TextureId>);
    /// Min and mag filter parameter calls for the bound texture.
    fn tex_filter(&mut self, filter: Filter);
    /// Wrap mode parameter call for one axis of the bound texture.
    fn tex_wrap(&mut self, axis: WrapAxis, mode: WrapMode);
    /// The four swizzle parameter calls for the bound texture.
    fn tex_swizzle(&mut self, swizzle: [Channel; 4]);
    /// `glGenerateMipmap(GL_TEXTURE_2D)`.
    fn generate_mipmaps(&mut self);
    /// `glTexImage2D` at level 0. `sized` selects a sized internal format.
    fn tex_image_2d(
        &mut self,
        config: PixelConfig,
        sized: bool,
        width: i32,
        height: i32,
        data: Option<&[u8]>,
    );
    /// `glTexSubImage2D` at level 0. `bottom` is in GL's bottom-up rows.
    fn tex_sub_image_2d(
        &mut self,
        left: i32,
        bottom: i32,
        width: i32,
        height: i32,
        config: PixelConfig,
        data: &[u8],
    );
    /// `glTexStorage2D` with one level.
    fn tex_storage_2d(&mut self, config: PixelConfig, width: i32, height: i32);
    /// `glCompressedTexImage2D` at level 0.
    fn compressed_tex_image_2d(&mut self, config: PixelConfig, width: i32, height: i32, data: &[u8]);
    /// `glCopyTexSubImage2D` at level 0 into the bound texture, reading from
    /// the bound read framebuffer.
    fn copy_tex_sub_image_2d(&mut self, dst_left: i32, dst_bottom: i32, src: GlRect);

    // Pixel store state.

    /// `glPixelStorei(GL_PACK_ROW_LENGTH, ..)` (pixels, 0 restores tight).
    fn set_pack_row_length(&mut self, pixels: i32);
    /// `glPixelStorei(GL_PACK_REVERSE_ROW_ORDER, ..)`.
    fn set_pack_reverse_row_order(&mut self, reversed: bool);
    /// `glPixelStorei(GL_UNPACK_ROW_LENGTH, ..)` (pixels, 0 restores tight).
    fn set_unpack_row_length(&mut self, pixels: i32);
    /// `glPixelStorei(GL_UNPACK_FLIP_Y, ..)`.
    fn set_unpack_flip_y(&mut self, flipped: bool);
    /// `glPixelStorei(GL_UNPACK_ALIGNMENT, ..)`.
    fn set_unpack_alignment(&mut self, bytes: i32);

    // Framebuffer and renderbuffer objects.

    /// `glGenFramebuffers(1, ..)`.
    fn gen_framebuffer(&mut self) -> Option<FramebufferId>;
    /// `glDeleteFramebuffers(1, ..)`.
    fn delete_framebuffer(&mut self, id: FramebufferId);
    /// `glBindFramebuffer`.
    fn bind_framebuffer(&mut self, target: FboTarget, id: Option<FramebufferId>);
    /// `glFramebufferTexture2D` at level 0 on the `GL_FRAMEBUFFER` binding.
    fn framebuffer_texture_2d(&mut self, attachment: Attachment, id: Option<TextureId>);
    /// `glFramebufferRenderbuffer` on the `GL_FRAMEBUFFER` binding.
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, id: Option<RenderbufferId>);
    /// `glCheckFramebufferStatus(GL_FRAMEBUFFER) == GL_FRAMEBUFFER_COMPLETE`.
    fn check_framebuffer_complete(&mut self) -> bool;
    /// `glInvalidateFramebuffer` / `glDiscardFramebufferEXT`.
    fn invalidate_framebuffer(&mut self, attachments: &[Attachment]);
    /// `glGenRenderbuffers(1, ..)`.
    fn gen_renderbuffer(&mut self) -> Option<RenderbufferId>;
    /// `glDeleteRenderbuffers(1, ..)`.
    fn delete_renderbuffer(&mut self, id: RenderbufferId);
    /// `glBindRenderbuffer(GL_RENDERBUFFER, ..)`.
    fn bind_renderbuffer(&mut self, id: Option<RenderbufferId>);
    /// `glRenderbufferStorage` for the bound renderbuffer.
    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: i32, height: i32);
    /// `glRenderbufferStorageMultisample` for the bound renderbuffer.
    fn renderbuffer_storage_multisample(
        &mut self,
        samples: u32,
        format: RenderbufferFormat,
        width: i32,
        height: i32,
    );
    /// Query the bound renderbuffer's stencil or depth bit depth.
    fn get_renderbuffer_bits(&mut self, attachment: Attachment) -> u32;
    /// `glBlitFramebuffer` of the color buffer with nearest filtering. When
    /// `mirror_y` is set the source rows are read in reverse order.
    fn blit_framebuffer(&mut self, src: GlRect, dst: GlRect, mirror_y: bool);
    /// `glResolveMultisampleFramebuffer` (Apple-style whole-framebuffer
    /// resolve, constrained by the current scissor).
    fn resolve_multisample_framebuffer(&mut self);

    // Fixed-function state.

    /// `glEnable`.
    fn enable(&mut self, cap: GlCap);
    /// `glDisable`.
    fn disable(&mut self, cap: GlCap);
    /// `glScissor`.
    fn scissor(&mut self, rect: GlRect);
    /// `glViewport`.
    fn viewport(&mut self, rect: GlRect);
    /// `glBlendFunc`.
    fn blend_func(&mut self, src: BlendCoeff, dst: BlendCoeff);
    /// `glBlendColor`.
    fn blend_color(&mut self, color: [f32; 4]);
    /// `glColorMask` with all four channels set to `write`.
    fn color_mask(&mut self, write: bool);
    /// `glCullFace`.
    fn cull_face(&mut self, face: CullFace);
    /// `glStencilFunc` / `glStencilFuncSeparate`.
    fn stencil_func(&mut self, face: Option<StencilFace>, func: StencilFunc, reference: u32, mask: u32);
    /// `glStencilOp` / `glStencilOpSeparate` (depth always passes here, so
    /// the pass op is used for both depth-fail and depth-pass).
    fn stencil_op(&mut self, face: Option<StencilFace>, fail: StencilOp, pass: StencilOp);
    /// `glStencilMask` / `glStencilMaskSeparate`.
    fn stencil_mask(&mut self, face: Option<StencilFace>, mask: u32);
    /// `glClearColor`.
    fn clear_color(&mut self, color: [f32; 4]);
    /// `glClearStencil`.
    fn clear_stencil_value(&mut self, value: i32);
    /// `glClear` of the selected buffers.
    fn clear(&mut self, color: bool, stencil: bool);

    // Pixel readback and draws.

    /// `glReadPixels` of `rect` from the bound read framebuffer into `dst`,
    /// honoring the current pack state (row length, reverse row order).
    fn read_pixels(&mut self, rect: GlRect, config: PixelConfig, dst: &mut [u8]);
    /// `glDrawElements` with 32-bit indices at a byte offset into the bound
    /// index buffer.
    fn draw_elements(&mut self, primitive: Primitive, count: i32, offset: usize);
    /// `glDrawArrays`.
    fn draw_arrays(&mut self, primitive: Primitive, first: i32, count: i32);
}
