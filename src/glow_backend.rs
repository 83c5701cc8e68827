//! The production [`GlInterface`] backend over a [glow] context.
//!
//! Each trait method translates its typed arguments to GL enums and issues
//! exactly one glow call, keeping the device's one-call-per-method cache
//! assumption intact.
//!
//! [glow]: https://docs.rs/glow

use std::ptr::NonNull;
use std::sync::Arc;

use glow::{HasContext, PixelPackData, PixelUnpackData};

use crate::interface::{
    Attachment, BlendCoeff, BufferId, BufferTarget, BufferUsageHint, Channel, CullFace, FboTarget,
    Filter, FramebufferId, GlCap, GlErrorCode, GlInterface, MapAccess, Primitive,
    RenderbufferFormat, RenderbufferId, StencilFace, StencilFunc, StencilOp, TextureId, WrapAxis,
    WrapMode,
};
use crate::pixel::PixelConfig;
use crate::rect::GlRect;
use crate::stencil::StencilFormatKind;

// Constants glow's curated registry leaves out.
const GL_ALPHA8: u32 = 0x803C;
const GL_STENCIL_INDEX: u32 = 0x1901;
const GL_STENCIL_INDEX16: u32 = 0x8D49;
const GL_ETC1_RGB8: u32 = 0x8D64;
const GL_PACK_REVERSE_ROW_ORDER_ANGLE: u32 = 0x93A4;
const GL_UNPACK_FLIP_Y_WEBGL: u32 = 0x9240;

/// Convert a dimension or byte count to the `i32` GL entry points expect.
///
/// # Panics
///
/// Panics if `value > i32::MAX`. In practice unreachable for texture
/// dimensions and buffer sizes GL would accept.
fn gl_size(value: usize) -> i32 {
    i32::try_from(value).expect("size exceeds i32::MAX")
}

fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::PixelPack => glow::PIXEL_PACK_BUFFER,
        BufferTarget::PixelUnpack => glow::PIXEL_UNPACK_BUFFER,
    }
}

fn usage_hint(usage: BufferUsageHint) -> u32 {
    match usage {
        BufferUsageHint::StaticDraw => glow::STATIC_DRAW,
        BufferUsageHint::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsageHint::StreamDraw => glow::STREAM_DRAW,
        BufferUsageHint::StreamRead => glow::STREAM_READ,
    }
}

fn fbo_target(target: FboTarget) -> u32 {
    match target {
        FboTarget::Both => glow::FRAMEBUFFER,
        FboTarget::Read => glow::READ_FRAMEBUFFER,
        FboTarget::Draw => glow::DRAW_FRAMEBUFFER,
    }
}

fn attachment_point(attachment: Attachment) -> u32 {
    match attachment {
        Attachment::Color => glow::COLOR_ATTACHMENT0,
        Attachment::Stencil => glow::STENCIL_ATTACHMENT,
        Attachment::Depth => glow::DEPTH_ATTACHMENT,
    }
}

fn gl_cap(cap: GlCap) -> u32 {
    match cap {
        GlCap::ScissorTest => glow::SCISSOR_TEST,
        GlCap::StencilTest => glow::STENCIL_TEST,
        GlCap::Blend => glow::BLEND,
        GlCap::Dither => glow::DITHER,
        GlCap::CullFace => glow::CULL_FACE,
    }
}

fn blend_coeff(coeff: BlendCoeff) -> u32 {
    match coeff {
        BlendCoeff::Zero => glow::ZERO,
        BlendCoeff::One => glow::ONE,
        BlendCoeff::SrcColor => glow::SRC_COLOR,
        BlendCoeff::InvSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendCoeff::DstColor => glow::DST_COLOR,
        BlendCoeff::InvDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendCoeff::SrcAlpha => glow::SRC_ALPHA,
        BlendCoeff::InvSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendCoeff::DstAlpha => glow::DST_ALPHA,
        BlendCoeff::InvDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendCoeff::ConstColor => glow::CONSTANT_COLOR,
        BlendCoeff::InvConstColor => glow::ONE_MINUS_CONSTANT_COLOR,
        BlendCoeff::ConstAlpha => glow::CONSTANT_ALPHA,
        BlendCoeff::InvConstAlpha => glow::ONE_MINUS_CONSTANT_ALPHA,
    }
}

fn stencil_face(face: StencilFace) -> u32 {
    match face {
        StencilFace::Front => glow::FRONT,
        StencilFace::Back => glow::BACK,
    }
}

fn stencil_func(func: StencilFunc) -> u32 {
    match func {
        StencilFunc::Always => glow::ALWAYS,
        StencilFunc::Never => glow::NEVER,
        StencilFunc::Greater => glow::GREATER,
        StencilFunc::GEqual => glow::GEQUAL,
        StencilFunc::Less => glow::LESS,
        StencilFunc::LEqual => glow::LEQUAL,
        StencilFunc::Equal => glow::EQUAL,
        StencilFunc::NotEqual => glow::NOTEQUAL,
    }
}

fn stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::IncWrap => glow::INCR_WRAP,
        StencilOp::IncClamp => glow::INCR,
        StencilOp::DecWrap => glow::DECR_WRAP,
        StencilOp::DecClamp => glow::DECR,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Invert => glow::INVERT,
    }
}

fn primitive(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        Primitive::TriangleFan => glow::TRIANGLE_FAN,
        Primitive::Points => glow::POINTS,
        Primitive::Lines => glow::LINES,
        Primitive::LineStrip => glow::LINE_STRIP,
    }
}

fn wrap_mode(mode: WrapMode) -> i32 {
    #[expect(clippy::cast_possible_wrap)]
    let value = match mode {
        WrapMode::Clamp => glow::CLAMP_TO_EDGE,
        WrapMode::Repeat => glow::REPEAT,
        WrapMode::MirrorRepeat => glow::MIRRORED_REPEAT,
    } as i32;
    value
}

fn swizzle_source(channel: Channel) -> i32 {
    #[expect(clippy::cast_possible_wrap)]
    let value = match channel {
        Channel::Red => glow::RED,
        Channel::Green => glow::GREEN,
        Channel::Blue => glow::BLUE,
        Channel::Alpha => glow::ALPHA,
        Channel::Zero => glow::ZERO,
        Channel::One => glow::ONE,
    } as i32;
    value
}

fn stencil_storage_format(kind: StencilFormatKind) -> u32 {
    match kind {
        StencilFormatKind::Stencil8 => glow::STENCIL_INDEX8,
        StencilFormatKind::Stencil16 => GL_STENCIL_INDEX16,
        StencilFormatKind::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
        StencilFormatKind::UnsizedIndex => GL_STENCIL_INDEX,
    }
}

fn color_storage_format(config: PixelConfig) -> u32 {
    match config {
        PixelConfig::Rgba8888 | PixelConfig::Bgra8888 => glow::RGBA8,
        PixelConfig::Rgb565 => glow::RGB565,
        PixelConfig::Rgba4444 => glow::RGBA4,
        PixelConfig::Alpha8 => GL_ALPHA8,
        PixelConfig::Etc1 => GL_ETC1_RGB8,
    }
}

/// (internal format, external format, component type) for a texture upload.
/// `sized` selects the sized internal format where one exists; BGRA's sized
/// internal format is plain `RGBA8` (the desktop arrangement).
fn tex_formats(config: PixelConfig, sized: bool) -> (i32, u32, u32) {
    let (sized_internal, unsized_internal, format, component) = match config {
        PixelConfig::Rgba8888 => (glow::RGBA8, glow::RGBA, glow::RGBA, glow::UNSIGNED_BYTE),
        PixelConfig::Bgra8888 => (glow::RGBA8, glow::BGRA, glow::BGRA, glow::UNSIGNED_BYTE),
        PixelConfig::Rgb565 => (
            glow::RGB565,
            glow::RGB,
            glow::RGB,
            glow::UNSIGNED_SHORT_5_6_5,
        ),
        PixelConfig::Rgba4444 => (
            glow::RGBA4,
            glow::RGBA,
            glow::RGBA,
            glow::UNSIGNED_SHORT_4_4_4_4,
        ),
        // Alpha data travels through the legacy ALPHA channel; the red-channel
        // arrangement is the device's concern, expressed through swizzles.
        PixelConfig::Alpha8 => (GL_ALPHA8, glow::ALPHA, glow::ALPHA, glow::UNSIGNED_BYTE),
        PixelConfig::Etc1 => (GL_ETC1_RGB8, GL_ETC1_RGB8, GL_ETC1_RGB8, glow::UNSIGNED_BYTE),
    };
    let internal = if sized { sized_internal } else { unsized_internal };
    #[expect(clippy::cast_possible_wrap)]
    let internal = internal as i32;
    (internal, format, component)
}

/// [`GlInterface`] implementation issuing real driver calls through glow.
///
/// # Safety
///
/// Every method requires the wrapped context to be current on the calling
/// thread; the constructor is `unsafe` to record that obligation once.
pub struct GlowInterface {
    gl: Arc<glow::Context>,
}

impl GlowInterface {
    /// Wrap a glow context.
    ///
    /// # Safety
    ///
    /// The context must be current on this thread whenever the returned
    /// interface (or a device built on it) is used.
    #[must_use]
    pub unsafe fn new(gl: Arc<glow::Context>) -> Self {
        Self { gl }
    }
}

impl GlInterface for GlowInterface {
    fn get_error(&mut self) -> Option<GlErrorCode> {
        let error = unsafe { self.gl.get_error() };
        match error {
            glow::NO_ERROR => None,
            glow::OUT_OF_MEMORY => Some(GlErrorCode::OutOfMemory),
            glow::INVALID_ENUM => Some(GlErrorCode::InvalidEnum),
            glow::INVALID_VALUE => Some(GlErrorCode::InvalidValue),
            glow::INVALID_OPERATION => Some(GlErrorCode::InvalidOperation),
            _ => Some(GlErrorCode::Unknown),
        }
    }

    fn gen_buffer(&mut self) -> Option<BufferId> {
        unsafe { self.gl.create_buffer() }.ok().map(|b| BufferId(b.0))
    }

    fn delete_buffer(&mut self, id: BufferId) {
        unsafe { self.gl.delete_buffer(glow::NativeBuffer(id.0)) };
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        unsafe {
            self.gl
                .bind_buffer(buffer_target(target), id.map(|i| glow::NativeBuffer(i.0)));
        }
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        size: usize,
        data: Option<&[u8]>,
        usage: BufferUsageHint,
    ) {
        let target = buffer_target(target);
        let usage = usage_hint(usage);
        unsafe {
            match data {
                Some(d) => self.gl.buffer_data_u8_slice(target, d, usage),
                None => self.gl.buffer_data_size(target, gl_size(size), usage),
            }
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(buffer_target(target), gl_size(offset), data);
        }
    }

    fn map_buffer_range(
        &mut self,
        target: BufferTarget,
        offset: usize,
        len: usize,
        access: MapAccess,
    ) -> Option<NonNull<u8>> {
        let access = match access {
            MapAccess::Read => glow::MAP_READ_BIT,
            MapAccess::Write => glow::MAP_WRITE_BIT,
            MapAccess::WriteDiscard => glow::MAP_WRITE_BIT | glow::MAP_INVALIDATE_BUFFER_BIT,
        };
        let ptr = unsafe {
            self.gl
                .map_buffer_range(buffer_target(target), gl_size(offset), gl_size(len), access)
        };
        NonNull::new(ptr)
    }

    fn unmap_buffer(&mut self, target: BufferTarget) -> bool {
        unsafe { self.gl.unmap_buffer(buffer_target(target)) };
        // glow swallows the corruption flag; any resulting error surfaces
        // through the next get_error drain instead.
        true
    }

    fn gen_texture(&mut self) -> Option<TextureId> {
        unsafe { self.gl.create_texture() }.ok().map(|t| TextureId(t.0))
    }

    fn delete_texture(&mut self, id: TextureId) {
        unsafe { self.gl.delete_texture(glow::NativeTexture(id.0)) };
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn bind_texture(&mut self, id: Option<TextureId>) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, id.map(|i| glow::NativeTexture(i.0)));
        }
    }

    fn tex_filter(&mut self, filter: Filter) {
        let (min, mag) = match filter {
            Filter::Nearest => (glow::NEAREST, glow::NEAREST),
            Filter::Bilinear => (glow::LINEAR, glow::LINEAR),
            Filter::MipMap => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
        };
        #[expect(clippy::cast_possible_wrap)]
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag as i32);
        }
    }

    fn tex_wrap(&mut self, axis: WrapAxis, mode: WrapMode) {
        let pname = match axis {
            WrapAxis::S => glow::TEXTURE_WRAP_S,
            WrapAxis::T => glow::TEXTURE_WRAP_T,
        };
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, pname, wrap_mode(mode));
        }
    }

    fn tex_swizzle(&mut self, swizzle: [Channel; 4]) {
        let pnames = [
            glow::TEXTURE_SWIZZLE_R,
            glow::TEXTURE_SWIZZLE_G,
            glow::TEXTURE_SWIZZLE_B,
            glow::TEXTURE_SWIZZLE_A,
        ];
        for (pname, channel) in pnames.into_iter().zip(swizzle) {
            unsafe {
                self.gl
                    .tex_parameter_i32(glow::TEXTURE_2D, pname, swizzle_source(channel));
            }
        }
    }

    fn generate_mipmaps(&mut self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) };
    }

    fn tex_image_2d(
        &mut self,
        config: PixelConfig,
        sized: bool,
        width: i32,
        height: i32,
        data: Option<&[u8]>,
    ) {
        let (internal, format, component) = tex_formats(config, sized);
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width,
                height,
                0,
                format,
                component,
                PixelUnpackData::Slice(data),
            );
        }
    }

    fn tex_sub_image_2d(
        &mut self,
        left: i32,
        bottom: i32,
        width: i32,
        height: i32,
        config: PixelConfig,
        data: &[u8],
    ) {
        let (_, format, component) = tex_formats(config, false);
        unsafe {
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                left,
                bottom,
                width,
                height,
                format,
                component,
                PixelUnpackData::Slice(Some(data)),
            );
        }
    }

    fn tex_storage_2d(&mut self, config: PixelConfig, width: i32, height: i32) {
        unsafe {
            self.gl
                .tex_storage_2d(glow::TEXTURE_2D, 1, color_storage_format(config), width, height);
        }
    }

    fn compressed_tex_image_2d(&mut self, config: PixelConfig, width: i32, height: i32, data: &[u8]) {
        #[expect(clippy::cast_possible_wrap)]
        let internal = color_storage_format(config) as i32;
        unsafe {
            self.gl.compressed_tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width,
                height,
                0,
                gl_size(data.len()),
                data,
            );
        }
    }

    fn copy_tex_sub_image_2d(&mut self, dst_left: i32, dst_bottom: i32, src: GlRect) {
        unsafe {
            self.gl.copy_tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                dst_left,
                dst_bottom,
                src.left,
                src.bottom,
                src.width,
                src.height,
            );
        }
    }

    fn set_pack_row_length(&mut self, pixels: i32) {
        unsafe { self.gl.pixel_store_i32(glow::PACK_ROW_LENGTH, pixels) };
    }

    fn set_pack_reverse_row_order(&mut self, reversed: bool) {
        unsafe {
            self.gl
                .pixel_store_i32(GL_PACK_REVERSE_ROW_ORDER_ANGLE, i32::from(reversed));
        }
    }

    fn set_unpack_row_length(&mut self, pixels: i32) {
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, pixels) };
    }

    fn set_unpack_flip_y(&mut self, flipped: bool) {
        unsafe {
            self.gl
                .pixel_store_i32(GL_UNPACK_FLIP_Y_WEBGL, i32::from(flipped));
        }
    }

    fn set_unpack_alignment(&mut self, bytes: i32) {
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, bytes) };
    }

    fn gen_framebuffer(&mut self) -> Option<FramebufferId> {
        unsafe { self.gl.create_framebuffer() }
            .ok()
            .map(|f| FramebufferId(f.0))
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        unsafe { self.gl.delete_framebuffer(glow::NativeFramebuffer(id.0)) };
    }

    fn bind_framebuffer(&mut self, target: FboTarget, id: Option<FramebufferId>) {
        unsafe {
            self.gl
                .bind_framebuffer(fbo_target(target), id.map(|i| glow::NativeFramebuffer(i.0)));
        }
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, id: Option<TextureId>) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment_point(attachment),
                glow::TEXTURE_2D,
                id.map(|i| glow::NativeTexture(i.0)),
                0,
            );
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, id: Option<RenderbufferId>) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment_point(attachment),
                glow::RENDERBUFFER,
                id.map(|i| glow::NativeRenderbuffer(i.0)),
            );
        }
    }

    fn check_framebuffer_complete(&mut self) -> bool {
        let status = unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        status == glow::FRAMEBUFFER_COMPLETE
    }

    fn invalidate_framebuffer(&mut self, attachments: &[Attachment]) {
        let points: Vec<u32> = attachments.iter().map(|a| attachment_point(*a)).collect();
        unsafe { self.gl.invalidate_framebuffer(glow::FRAMEBUFFER, &points) };
    }

    fn gen_renderbuffer(&mut self) -> Option<RenderbufferId> {
        unsafe { self.gl.create_renderbuffer() }
            .ok()
            .map(|r| RenderbufferId(r.0))
    }

    fn delete_renderbuffer(&mut self, id: RenderbufferId) {
        unsafe { self.gl.delete_renderbuffer(glow::NativeRenderbuffer(id.0)) };
    }

    fn bind_renderbuffer(&mut self, id: Option<RenderbufferId>) {
        unsafe {
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, id.map(|i| glow::NativeRenderbuffer(i.0)));
        }
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: i32, height: i32) {
        let internal = match format {
            RenderbufferFormat::Color(config) => color_storage_format(config),
            RenderbufferFormat::Stencil(kind) => stencil_storage_format(kind),
        };
        unsafe {
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal, width, height);
        }
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: u32,
        format: RenderbufferFormat,
        width: i32,
        height: i32,
    ) {
        let internal = match format {
            RenderbufferFormat::Color(config) => color_storage_format(config),
            RenderbufferFormat::Stencil(kind) => stencil_storage_format(kind),
        };
        let samples = i32::try_from(samples).unwrap_or(i32::MAX);
        unsafe {
            self.gl.renderbuffer_storage_multisample(
                glow::RENDERBUFFER,
                samples,
                internal,
                width,
                height,
            );
        }
    }

    fn get_renderbuffer_bits(&mut self, attachment: Attachment) -> u32 {
        let pname = match attachment {
            Attachment::Stencil => glow::RENDERBUFFER_STENCIL_SIZE,
            Attachment::Depth => glow::RENDERBUFFER_DEPTH_SIZE,
            Attachment::Color => glow::RENDERBUFFER_RED_SIZE,
        };
        let bits = unsafe {
            self.gl
                .get_renderbuffer_parameter_i32(glow::RENDERBUFFER, pname)
        };
        u32::try_from(bits).unwrap_or(0)
    }

    fn blit_framebuffer(&mut self, src: GlRect, dst: GlRect, mirror_y: bool) {
        let (src_y0, src_y1) = if mirror_y {
            (src.bottom + src.height, src.bottom)
        } else {
            (src.bottom, src.bottom + src.height)
        };
        unsafe {
            self.gl.blit_framebuffer(
                src.left,
                src_y0,
                src.left + src.width,
                src_y1,
                dst.left,
                dst.bottom,
                dst.left + dst.width,
                dst.bottom + dst.height,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
        }
    }

    fn resolve_multisample_framebuffer(&mut self) {
        // glResolveMultisampleFramebufferAPPLE has no glow binding; the caps
        // probe never selects the resolve-primitive path on contexts reached
        // through glow.
        debug_assert!(false, "resolve primitive unavailable through glow");
    }

    fn enable(&mut self, cap: GlCap) {
        unsafe { self.gl.enable(gl_cap(cap)) };
    }

    fn disable(&mut self, cap: GlCap) {
        unsafe { self.gl.disable(gl_cap(cap)) };
    }

    fn scissor(&mut self, rect: GlRect) {
        unsafe { self.gl.scissor(rect.left, rect.bottom, rect.width, rect.height) };
    }

    fn viewport(&mut self, rect: GlRect) {
        unsafe { self.gl.viewport(rect.left, rect.bottom, rect.width, rect.height) };
    }

    fn blend_func(&mut self, src: BlendCoeff, dst: BlendCoeff) {
        unsafe { self.gl.blend_func(blend_coeff(src), blend_coeff(dst)) };
    }

    fn blend_color(&mut self, color: [f32; 4]) {
        unsafe { self.gl.blend_color(color[0], color[1], color[2], color[3]) };
    }

    fn color_mask(&mut self, write: bool) {
        unsafe { self.gl.color_mask(write, write, write, write) };
    }

    fn cull_face(&mut self, face: CullFace) {
        let face = match face {
            CullFace::Front => glow::FRONT,
            CullFace::Back => glow::BACK,
        };
        unsafe { self.gl.cull_face(face) };
    }

    fn stencil_func(
        &mut self,
        face: Option<StencilFace>,
        func: StencilFunc,
        reference: u32,
        mask: u32,
    ) {
        #[expect(clippy::cast_possible_wrap)]
        let reference = reference as i32;
        unsafe {
            match face {
                Some(f) => {
                    self.gl
                        .stencil_func_separate(stencil_face(f), stencil_func(func), reference, mask);
                }
                None => self.gl.stencil_func(stencil_func(func), reference, mask),
            }
        }
    }

    fn stencil_op(&mut self, face: Option<StencilFace>, fail: StencilOp, pass: StencilOp) {
        let (fail, pass) = (stencil_op(fail), stencil_op(pass));
        unsafe {
            match face {
                // Depth always passes here, so the pass op covers both
                // depth-fail and depth-pass.
                Some(f) => self.gl.stencil_op_separate(stencil_face(f), fail, pass, pass),
                None => self.gl.stencil_op(fail, pass, pass),
            }
        }
    }

    fn stencil_mask(&mut self, face: Option<StencilFace>, mask: u32) {
        unsafe {
            match face {
                Some(f) => self.gl.stencil_mask_separate(stencil_face(f), mask),
                None => self.gl.stencil_mask(mask),
            }
        }
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        unsafe { self.gl.clear_color(color[0], color[1], color[2], color[3]) };
    }

    fn clear_stencil_value(&mut self, value: i32) {
        unsafe { self.gl.clear_stencil(value) };
    }

    fn clear(&mut self, color: bool, stencil: bool) {
        let mut mask = 0;
        if color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if stencil {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        if mask != 0 {
            unsafe { self.gl.clear(mask) };
        }
    }

    fn read_pixels(&mut self, rect: GlRect, config: PixelConfig, dst: &mut [u8]) {
        let (_, format, component) = tex_formats(config, false);
        unsafe {
            self.gl.read_pixels(
                rect.left,
                rect.bottom,
                rect.width,
                rect.height,
                format,
                component,
                PixelPackData::Slice(Some(dst)),
            );
        }
    }

    fn draw_elements(&mut self, topology: Primitive, count: i32, offset: usize) {
        unsafe {
            self.gl
                .draw_elements(primitive(topology), count, glow::UNSIGNED_INT, gl_size(offset));
        }
    }

    fn draw_arrays(&mut self, topology: Primitive, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(primitive(topology), first, count) };
    }
}
