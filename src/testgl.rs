//! Recording, simulating GL double for tests.
//!
//! Records every call for pattern assertions and simulates just enough of
//! GL's object model (buffer stores, texture and renderbuffer pixel stores,
//! framebuffer attachments, the pixel pack/unpack state) that uploads,
//! readbacks, blits and clears can be verified end to end. Pixel stores keep
//! GL's layout: tight rows, row 0 at the bottom.

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroU32;
use std::ptr::NonNull;

use crate::interface::{
    Attachment, BlendCoeff, BufferId, BufferTarget, BufferUsageHint, Channel, CullFace, FboTarget,
    Filter, FramebufferId, GlCap, GlErrorCode, GlInterface, MapAccess, Primitive, RenderbufferFormat,
    RenderbufferId, StencilFace, StencilFunc, StencilOp, TextureId, WrapAxis, WrapMode,
};
use crate::pixel::PixelConfig;
use crate::rect::GlRect;
use crate::stencil::StencilFormatKind;

pub(crate) fn fake_renderbuffer_id(name: u32) -> Option<RenderbufferId> {
    NonZeroU32::new(name).map(RenderbufferId)
}

#[derive(Clone, Debug, PartialEq)]
#[allow(dead_code)] // variants exist for matching, not all are constructed in every test build
pub(crate) enum Call {
    Enable(GlCap),
    Disable(GlCap),
    BindBuffer(BufferTarget, Option<u32>),
    BufferData { target: BufferTarget, null: bool },
    BufferSubData(BufferTarget),
    MapBuffer(BufferTarget),
    UnmapBuffer(BufferTarget),
    DeleteBuffer(u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexFilter(Filter),
    TexWrap(WrapAxis, WrapMode),
    TexSwizzle([Channel; 4]),
    GenerateMipmaps,
    TexImage2D,
    TexSubImage2D,
    TexStorage2D,
    CompressedTexImage2D,
    CopyTexSubImage2D,
    DeleteTexture(u32),
    PackRowLength(i32),
    PackReverse(bool),
    UnpackRowLength(i32),
    UnpackFlipY(bool),
    UnpackAlignment(i32),
    BindFramebuffer(FboTarget, Option<u32>),
    FramebufferTexture(Attachment, Option<u32>),
    FramebufferRenderbuffer(Attachment, Option<u32>),
    CheckComplete,
    InvalidateFramebuffer,
    DeleteFramebuffer(u32),
    BindRenderbuffer(Option<u32>),
    RenderbufferStorage { format: RenderbufferFormat, samples: u32 },
    DeleteRenderbuffer(u32),
    Blit { src: GlRect, dst: GlRect, mirror: bool },
    ResolveMultisample,
    Scissor(GlRect),
    Viewport(GlRect),
    BlendFunc(BlendCoeff, BlendCoeff),
    BlendColor([f32; 4]),
    ColorMask(bool),
    CullFaceCall(CullFace),
    StencilFuncCall,
    StencilOpCall,
    StencilMask(Option<StencilFace>, u32),
    ClearColor([f32; 4]),
    ClearStencilValue(i32),
    Clear { color: bool, stencil: bool },
    ReadPixels,
    DrawElements,
    DrawArrays,
}

#[derive(Default)]
struct TexStore {
    width: i32,
    height: i32,
    config: Option<PixelConfig>,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct RbStore {
    format: Option<RenderbufferFormat>,
    width: i32,
    height: i32,
    samples: u32,
    pixels: Vec<u8>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum AttachRef {
    Tex(u32),
    Rb(u32),
}

#[derive(Default)]
struct FboStore {
    color: Option<AttachRef>,
    stencil: Option<u32>,
    depth: Option<u32>,
}

pub(crate) struct TestGl {
    log: Vec<Call>,
    next_name: u32,
    buffers: HashMap<u32, Box<[u8]>>,
    deleted_buffers: HashSet<u32>,
    bound_buffers: HashMap<BufferTarget, u32>,
    textures: HashMap<u32, TexStore>,
    renderbuffers: HashMap<u32, RbStore>,
    framebuffers: HashMap<u32, FboStore>,
    bound_read_fbo: Option<u32>,
    bound_draw_fbo: Option<u32>,
    bound_rb: Option<u32>,
    active_unit: u32,
    bound_textures: HashMap<u32, u32>,
    pack_row_length: i32,
    pack_reverse: bool,
    unpack_row_length: i32,
    unpack_flip_y: bool,
    scissor_enabled: bool,
    scissor: GlRect,
    clear_color_value: [f32; 4],
    errors: VecDeque<GlErrorCode>,
    /// Stencil formats `renderbuffer_storage` accepts; others raise
    /// `InvalidEnum`.
    pub(crate) acceptable_stencil_formats: HashSet<StencilFormatKind>,
    /// Stencil formats that allocate but leave the framebuffer incomplete.
    pub(crate) incomplete_stencil_formats: HashSet<StencilFormatKind>,
    /// Fail this many upcoming renderbuffer allocations with out-of-memory.
    pub(crate) fail_renderbuffer_allocs: u32,
    /// Fail this many upcoming buffer allocations with out-of-memory.
    pub(crate) fail_buffer_allocs: u32,
    /// Fail this many upcoming texture allocations with out-of-memory.
    pub(crate) fail_tex_allocs: u32,
}

impl TestGl {
    pub(crate) fn new() -> Self {
        Self {
            log: Vec::new(),
            next_name: 1,
            buffers: HashMap::new(),
            deleted_buffers: HashSet::new(),
            bound_buffers: HashMap::new(),
            textures: HashMap::new(),
            renderbuffers: HashMap::new(),
            framebuffers: HashMap::new(),
            bound_read_fbo: None,
            bound_draw_fbo: None,
            bound_rb: None,
            active_unit: 0,
            bound_textures: HashMap::new(),
            pack_row_length: 0,
            pack_reverse: false,
            unpack_row_length: 0,
            unpack_flip_y: false,
            scissor_enabled: false,
            scissor: GlRect::default(),
            clear_color_value: [0.0; 4],
            errors: VecDeque::new(),
            acceptable_stencil_formats: [
                StencilFormatKind::Stencil8,
                StencilFormatKind::Stencil16,
                StencilFormatKind::Depth24Stencil8,
                StencilFormatKind::UnsizedIndex,
            ]
            .into_iter()
            .collect(),
            incomplete_stencil_formats: HashSet::new(),
            fail_renderbuffer_allocs: 0,
            fail_buffer_allocs: 0,
            fail_tex_allocs: 0,
        }
    }

    fn name(&mut self) -> u32 {
        let n = self.next_name;
        self.next_name += 1;
        n
    }

    // Test inspection helpers.

    pub(crate) fn clear_log(&mut self) {
        self.log.clear();
    }

    pub(crate) fn log_is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.log
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn count_enables(&self, cap: GlCap) -> usize {
        self.count(|c| *c == Call::Enable(cap))
    }

    pub(crate) fn count_disables(&self, cap: GlCap) -> usize {
        self.count(|c| *c == Call::Disable(cap))
    }

    pub(crate) fn count_buffer_binds(&self, target: BufferTarget) -> usize {
        self.count(|c| matches!(c, Call::BindBuffer(t, _) if *t == target))
    }

    pub(crate) fn count_buffer_data_null(&self, target: BufferTarget) -> usize {
        self.count(|c| matches!(c, Call::BufferData { target: t, null: true } if *t == target))
    }

    pub(crate) fn count_buffer_sub_data(&self, target: BufferTarget) -> usize {
        self.count(|c| matches!(c, Call::BufferSubData(t) if *t == target))
    }

    pub(crate) fn buffer_contents(&self, id: BufferId) -> &[u8] {
        self.buffers.get(&id.0.get()).map_or(&[] as &[u8], |b| &b[..])
    }

    pub(crate) fn buffer_was_deleted(&self, id: BufferId) -> bool {
        self.deleted_buffers.contains(&id.0.get())
    }

    pub(crate) fn bound_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        self.bound_buffers
            .get(&target)
            .and_then(|n| NonZeroU32::new(*n))
            .map(BufferId)
    }

    pub(crate) fn force_buffer_id(&mut self, name: u32) -> BufferId {
        self.buffers.entry(name).or_default();
        BufferId(NonZeroU32::new(name).expect("nonzero name"))
    }

    /// Raw pixel store of a texture: tight rows, row 0 at the bottom.
    pub(crate) fn texture_pixels(&self, id: TextureId) -> Option<&[u8]> {
        self.textures.get(&id.0.get()).map(|t| t.pixels.as_slice())
    }

    // Simulation internals.

    fn bound_tex_store(&mut self) -> Option<&mut TexStore> {
        let name = *self.bound_textures.get(&self.active_unit)?;
        self.textures.get_mut(&name)
    }

    fn fbo_color(&self, fbo: Option<u32>) -> Option<AttachRef> {
        self.framebuffers.get(&fbo?)?.color
    }

    /// Clone the color pixels (plus dimensions and bpp) behind a framebuffer.
    fn color_pixels(&self, fbo: Option<u32>) -> Option<(Vec<u8>, i32, i32, usize)> {
        match self.fbo_color(fbo)? {
            AttachRef::Tex(name) => {
                let t = self.textures.get(&name)?;
                let bpp = t.config?.bytes_per_pixel()?;
                Some((t.pixels.clone(), t.width, t.height, bpp))
            }
            AttachRef::Rb(name) => {
                let r = self.renderbuffers.get(&name)?;
                let bpp = match r.format? {
                    RenderbufferFormat::Color(c) => c.bytes_per_pixel()?,
                    RenderbufferFormat::Stencil(_) => return None,
                };
                Some((r.pixels.clone(), r.width, r.height, bpp))
            }
        }
    }

    fn with_color_pixels_mut<R>(
        &mut self,
        fbo: Option<u32>,
        f: impl FnOnce(&mut Vec<u8>, i32, i32, usize) -> R,
    ) -> Option<R> {
        match self.fbo_color(fbo)? {
            AttachRef::Tex(name) => {
                let t = self.textures.get_mut(&name)?;
                let bpp = t.config?.bytes_per_pixel()?;
                let (w, h) = (t.width, t.height);
                Some(f(&mut t.pixels, w, h, bpp))
            }
            AttachRef::Rb(name) => {
                let r = self.renderbuffers.get_mut(&name)?;
                let bpp = match r.format? {
                    RenderbufferFormat::Color(c) => c.bytes_per_pixel()?,
                    RenderbufferFormat::Stencil(_) => return None,
                };
                let (w, h) = (r.width, r.height);
                Some(f(&mut r.pixels, w, h, bpp))
            }
        }
    }

    /// Write a pixel rectangle into the texture bound on the active unit,
    /// honoring the unpack row length and flip state.
    fn store_tex_rows(&mut self, x: i32, y0: i32, w: i32, h: i32, data: &[u8]) {
        let row_px = if self.unpack_row_length > 0 {
            self.unpack_row_length
        } else {
            w
        };
        let flip = self.unpack_flip_y;
        let Some(t) = self.bound_tex_store() else { return };
        let Some(bpp) = t.config.and_then(PixelConfig::bytes_per_pixel) else {
            return;
        };
        let stride = row_px as usize * bpp;
        let tight = w as usize * bpp;
        let tex_w = t.width as usize;
        for r in 0..h {
            let gl_y = if flip { y0 + h - 1 - r } else { y0 + r };
            if gl_y < 0 || gl_y >= t.height {
                continue;
            }
            let src = r as usize * stride;
            let dst = (gl_y as usize * tex_w + x as usize) * bpp;
            t.pixels[dst..dst + tight].copy_from_slice(&data[src..src + tight]);
        }
    }

    fn scissor_clip(&self, rect: GlRect) -> GlRect {
        if !self.scissor_enabled {
            return rect;
        }
        let left = rect.left.max(self.scissor.left);
        let bottom = rect.bottom.max(self.scissor.bottom);
        let right = (rect.left + rect.width).min(self.scissor.left + self.scissor.width);
        let top = (rect.bottom + rect.height).min(self.scissor.bottom + self.scissor.height);
        GlRect {
            left,
            bottom,
            width: (right - left).max(0),
            height: (top - bottom).max(0),
        }
    }

    /// Copy a color rectangle between the read- and draw-bound framebuffers.
    fn copy_color(&mut self, src: GlRect, dst: GlRect, mirror: bool, honor_scissor: bool) {
        let Some((sp, sw, sh, bpp)) = self.color_pixels(self.bound_read_fbo) else {
            return;
        };
        let dst_fbo = self.bound_draw_fbo;
        let clipped = if honor_scissor { self.scissor_clip(dst) } else { dst };
        self.with_color_pixels_mut(dst_fbo, |dp, dw, dh, dbpp| {
            debug_assert_eq!(bpp, dbpp);
            for r in 0..clipped.height {
                let dy = clipped.bottom + r;
                // Row in the unclipped destination rect this corresponds to.
                let rel = dy - dst.bottom;
                let sy = if mirror {
                    src.bottom + src.height - 1 - rel
                } else {
                    src.bottom + rel
                };
                if dy < 0 || dy >= dh || sy < 0 || sy >= sh {
                    continue;
                }
                let sx = src.left + (clipped.left - dst.left);
                let copy_w = clipped.width as usize * bpp;
                let s = (sy as usize * sw as usize + sx as usize) * bpp;
                let d = (dy as usize * dw as usize + clipped.left as usize) * bpp;
                dp[d..d + copy_w].copy_from_slice(&sp[s..s + copy_w]);
            }
        });
    }
}

impl GlInterface for TestGl {
    fn get_error(&mut self) -> Option<GlErrorCode> {
        self.errors.pop_front()
    }

    fn gen_buffer(&mut self) -> Option<BufferId> {
        let n = self.name();
        self.buffers.insert(n, Box::default());
        NonZeroU32::new(n).map(BufferId)
    }

    fn delete_buffer(&mut self, id: BufferId) {
        self.log.push(Call::DeleteBuffer(id.0.get()));
        self.buffers.remove(&id.0.get());
        self.deleted_buffers.insert(id.0.get());
        self.bound_buffers.retain(|_, n| *n != id.0.get());
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        self.log.push(Call::BindBuffer(target, id.map(|i| i.0.get())));
        match id {
            Some(i) => {
                self.bound_buffers.insert(target, i.0.get());
            }
            None => {
                self.bound_buffers.remove(&target);
            }
        }
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        size: usize,
        data: Option<&[u8]>,
        _usage: BufferUsageHint,
    ) {
        self.log.push(Call::BufferData {
            target,
            null: data.is_none(),
        });
        if self.fail_buffer_allocs > 0 {
            self.fail_buffer_allocs -= 1;
            self.errors.push_back(GlErrorCode::OutOfMemory);
            return;
        }
        let Some(name) = self.bound_buffers.get(&target).copied() else {
            return;
        };
        let mut store = vec![0u8; size];
        if let Some(d) = data {
            store[..d.len()].copy_from_slice(d);
        }
        self.buffers.insert(name, store.into_boxed_slice());
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.log.push(Call::BufferSubData(target));
        let Some(name) = self.bound_buffers.get(&target).copied() else {
            return;
        };
        if let Some(store) = self.buffers.get_mut(&name) {
            store[offset..offset + data.len()].copy_from_slice(data);
        }
    }

    fn map_buffer_range(
        &mut self,
        target: BufferTarget,
        offset: usize,
        len: usize,
        _access: MapAccess,
    ) -> Option<NonNull<u8>> {
        self.log.push(Call::MapBuffer(target));
        let name = self.bound_buffers.get(&target).copied()?;
        let store = self.buffers.get_mut(&name)?;
        if offset + len > store.len() {
            return None;
        }
        // The boxed allocation is stable until the entry is replaced, which
        // the device never does while a map is outstanding.
        NonNull::new(unsafe { store.as_mut_ptr().add(offset) })
    }

    fn unmap_buffer(&mut self, target: BufferTarget) -> bool {
        self.log.push(Call::UnmapBuffer(target));
        true
    }

    fn gen_texture(&mut self) -> Option<TextureId> {
        let n = self.name();
        self.textures.insert(n, TexStore::default());
        NonZeroU32::new(n).map(TextureId)
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.log.push(Call::DeleteTexture(id.0.get()));
        self.textures.remove(&id.0.get());
        self.bound_textures.retain(|_, n| *n != id.0.get());
    }

    fn active_texture(&mut self, unit: u32) {
        self.log.push(Call::ActiveTexture(unit));
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, id: Option<TextureId>) {
        self.log.push(Call::BindTexture(id.map(|i| i.0.get())));
        match id {
            Some(i) => {
                self.bound_textures.insert(self.active_unit, i.0.get());
            }
            None => {
                self.bound_textures.remove(&self.active_unit);
            }
        }
    }

    fn tex_filter(&mut self, filter: Filter) {
        self.log.push(Call::TexFilter(filter));
    }

    fn tex_wrap(&mut self, axis: WrapAxis, mode: WrapMode) {
        self.log.push(Call::TexWrap(axis, mode));
    }

    fn tex_swizzle(&mut self, swizzle: [Channel; 4]) {
        self.log.push(Call::TexSwizzle(swizzle));
    }

    fn generate_mipmaps(&mut self) {
        self.log.push(Call::GenerateMipmaps);
    }

    fn tex_image_2d(
        &mut self,
        config: PixelConfig,
        _sized: bool,
        width: i32,
        height: i32,
        data: Option<&[u8]>,
    ) {
        self.log.push(Call::TexImage2D);
        if self.fail_tex_allocs > 0 {
            self.fail_tex_allocs -= 1;
            self.errors.push_back(GlErrorCode::OutOfMemory);
            return;
        }
        let bpp = config.bytes_per_pixel().unwrap_or(0);
        if let Some(t) = self.bound_tex_store() {
            t.width = width;
            t.height = height;
            t.config = Some(config);
            t.pixels = vec![0u8; width as usize * height as usize * bpp];
        }
        if let Some(d) = data {
            self.store_tex_rows(0, 0, width, height, d);
        }
    }

    fn tex_sub_image_2d(
        &mut self,
        left: i32,
        bottom: i32,
        width: i32,
        height: i32,
        _config: PixelConfig,
        data: &[u8],
    ) {
        self.log.push(Call::TexSubImage2D);
        self.store_tex_rows(left, bottom, width, height, data);
    }

    fn tex_storage_2d(&mut self, config: PixelConfig, width: i32, height: i32) {
        self.log.push(Call::TexStorage2D);
        if self.fail_tex_allocs > 0 {
            self.fail_tex_allocs -= 1;
            self.errors.push_back(GlErrorCode::OutOfMemory);
            return;
        }
        let bpp = config.bytes_per_pixel().unwrap_or(0);
        if let Some(t) = self.bound_tex_store() {
            t.width = width;
            t.height = height;
            t.config = Some(config);
            t.pixels = vec![0u8; width as usize * height as usize * bpp];
        }
    }

    fn compressed_tex_image_2d(&mut self, config: PixelConfig, width: i32, height: i32, data: &[u8]) {
        self.log.push(Call::CompressedTexImage2D);
        if let Some(t) = self.bound_tex_store() {
            t.width = width;
            t.height = height;
            t.config = Some(config);
            t.pixels = data.to_vec();
        }
    }

    fn copy_tex_sub_image_2d(&mut self, dst_left: i32, dst_bottom: i32, src: GlRect) {
        self.log.push(Call::CopyTexSubImage2D);
        let Some((sp, sw, _sh, bpp)) = self.color_pixels(self.bound_read_fbo) else {
            return;
        };
        let Some(t) = self.bound_tex_store() else { return };
        let tex_w = t.width as usize;
        let tight = src.width as usize * bpp;
        for r in 0..src.height {
            let sy = (src.bottom + r) as usize;
            let dy = (dst_bottom + r) as usize;
            let s = (sy * sw as usize + src.left as usize) * bpp;
            let d = (dy * tex_w + dst_left as usize) * bpp;
            t.pixels[d..d + tight].copy_from_slice(&sp[s..s + tight]);
        }
    }

    fn set_pack_row_length(&mut self, pixels: i32) {
        self.log.push(Call::PackRowLength(pixels));
        self.pack_row_length = pixels;
    }

    fn set_pack_reverse_row_order(&mut self, reversed: bool) {
        self.log.push(Call::PackReverse(reversed));
        self.pack_reverse = reversed;
    }

    fn set_unpack_row_length(&mut self, pixels: i32) {
        self.log.push(Call::UnpackRowLength(pixels));
        self.unpack_row_length = pixels;
    }

    fn set_unpack_flip_y(&mut self, flipped: bool) {
        self.log.push(Call::UnpackFlipY(flipped));
        self.unpack_flip_y = flipped;
    }

    fn set_unpack_alignment(&mut self, bytes: i32) {
        self.log.push(Call::UnpackAlignment(bytes));
    }

    fn gen_framebuffer(&mut self) -> Option<FramebufferId> {
        let n = self.name();
        self.framebuffers.insert(n, FboStore::default());
        NonZeroU32::new(n).map(FramebufferId)
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.log.push(Call::DeleteFramebuffer(id.0.get()));
        self.framebuffers.remove(&id.0.get());
    }

    fn bind_framebuffer(&mut self, target: FboTarget, id: Option<FramebufferId>) {
        self.log.push(Call::BindFramebuffer(target, id.map(|i| i.0.get())));
        let name = id.map(|i| i.0.get());
        match target {
            FboTarget::Both => {
                self.bound_read_fbo = name;
                self.bound_draw_fbo = name;
            }
            FboTarget::Read => self.bound_read_fbo = name,
            FboTarget::Draw => self.bound_draw_fbo = name,
        }
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, id: Option<TextureId>) {
        self.log
            .push(Call::FramebufferTexture(attachment, id.map(|i| i.0.get())));
        let Some(fbo) = self.bound_draw_fbo else { return };
        let Some(store) = self.framebuffers.get_mut(&fbo) else {
            return;
        };
        if attachment == Attachment::Color {
            store.color = id.map(|i| AttachRef::Tex(i.0.get()));
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, id: Option<RenderbufferId>) {
        self.log
            .push(Call::FramebufferRenderbuffer(attachment, id.map(|i| i.0.get())));
        let Some(fbo) = self.bound_draw_fbo else { return };
        let Some(store) = self.framebuffers.get_mut(&fbo) else {
            return;
        };
        let name = id.map(|i| i.0.get());
        match attachment {
            Attachment::Color => store.color = name.map(AttachRef::Rb),
            Attachment::Stencil => store.stencil = name,
            Attachment::Depth => store.depth = name,
        }
    }

    fn check_framebuffer_complete(&mut self) -> bool {
        self.log.push(Call::CheckComplete);
        let Some(fbo) = self.bound_draw_fbo else {
            return true;
        };
        let Some(store) = self.framebuffers.get(&fbo) else {
            return false;
        };
        if let Some(rb) = store.stencil {
            let kind = self.renderbuffers.get(&rb).and_then(|r| match r.format {
                Some(RenderbufferFormat::Stencil(k)) => Some(k),
                _ => None,
            });
            if let Some(k) = kind {
                if self.incomplete_stencil_formats.contains(&k) {
                    return false;
                }
            }
        }
        true
    }

    fn invalidate_framebuffer(&mut self, _attachments: &[Attachment]) {
        self.log.push(Call::InvalidateFramebuffer);
    }

    fn gen_renderbuffer(&mut self) -> Option<RenderbufferId> {
        let n = self.name();
        self.renderbuffers.insert(n, RbStore::default());
        NonZeroU32::new(n).map(RenderbufferId)
    }

    fn delete_renderbuffer(&mut self, id: RenderbufferId) {
        self.log.push(Call::DeleteRenderbuffer(id.0.get()));
        self.renderbuffers.remove(&id.0.get());
    }

    fn bind_renderbuffer(&mut self, id: Option<RenderbufferId>) {
        self.log.push(Call::BindRenderbuffer(id.map(|i| i.0.get())));
        self.bound_rb = id.map(|i| i.0.get());
    }

    fn renderbuffer_storage(&mut self, format: RenderbufferFormat, width: i32, height: i32) {
        self.renderbuffer_storage_multisample(0, format, width, height);
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: u32,
        format: RenderbufferFormat,
        width: i32,
        height: i32,
    ) {
        self.log.push(Call::RenderbufferStorage { format, samples });
        if self.fail_renderbuffer_allocs > 0 {
            self.fail_renderbuffer_allocs -= 1;
            self.errors.push_back(GlErrorCode::OutOfMemory);
            return;
        }
        if let RenderbufferFormat::Stencil(kind) = format {
            if !self.acceptable_stencil_formats.contains(&kind) {
                self.errors.push_back(GlErrorCode::InvalidEnum);
                return;
            }
        }
        let Some(rb) = self.bound_rb.and_then(|n| self.renderbuffers.get_mut(&n)) else {
            return;
        };
        rb.format = Some(format);
        rb.width = width;
        rb.height = height;
        rb.samples = samples;
        if let RenderbufferFormat::Color(c) = format {
            let bpp = c.bytes_per_pixel().unwrap_or(0);
            rb.pixels = vec![0u8; width as usize * height as usize * bpp];
        }
    }

    fn get_renderbuffer_bits(&mut self, attachment: Attachment) -> u32 {
        let Some(rb) = self.bound_rb.and_then(|n| self.renderbuffers.get(&n)) else {
            return 0;
        };
        match (attachment, rb.format) {
            (Attachment::Stencil, Some(RenderbufferFormat::Stencil(k))) => match k {
                StencilFormatKind::Stencil8
                | StencilFormatKind::Depth24Stencil8
                | StencilFormatKind::UnsizedIndex => 8,
                StencilFormatKind::Stencil16 => 16,
            },
            (Attachment::Depth, Some(RenderbufferFormat::Stencil(StencilFormatKind::Depth24Stencil8))) => 24,
            _ => 0,
        }
    }

    fn blit_framebuffer(&mut self, src: GlRect, dst: GlRect, mirror_y: bool) {
        self.log.push(Call::Blit {
            src,
            dst,
            mirror: mirror_y,
        });
        // The EXT flavor honors the scissor; emulating that here keeps the
        // resolve paths honest about disabling it.
        self.copy_color(src, dst, mirror_y, true);
    }

    fn resolve_multisample_framebuffer(&mut self) {
        self.log.push(Call::ResolveMultisample);
        let Some((_, w, h, _)) = self.color_pixels(self.bound_read_fbo) else {
            return;
        };
        let whole = GlRect::from_wh(w, h);
        self.copy_color(whole, whole, false, true);
    }

    fn enable(&mut self, cap: GlCap) {
        self.log.push(Call::Enable(cap));
        if cap == GlCap::ScissorTest {
            self.scissor_enabled = true;
        }
    }

    fn disable(&mut self, cap: GlCap) {
        self.log.push(Call::Disable(cap));
        if cap == GlCap::ScissorTest {
            self.scissor_enabled = false;
        }
    }

    fn scissor(&mut self, rect: GlRect) {
        self.log.push(Call::Scissor(rect));
        self.scissor = rect;
    }

    fn viewport(&mut self, rect: GlRect) {
        self.log.push(Call::Viewport(rect));
    }

    fn blend_func(&mut self, src: BlendCoeff, dst: BlendCoeff) {
        self.log.push(Call::BlendFunc(src, dst));
    }

    fn blend_color(&mut self, color: [f32; 4]) {
        self.log.push(Call::BlendColor(color));
    }

    fn color_mask(&mut self, write: bool) {
        self.log.push(Call::ColorMask(write));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.log.push(Call::CullFaceCall(face));
    }

    fn stencil_func(
        &mut self,
        _face: Option<StencilFace>,
        _func: StencilFunc,
        _reference: u32,
        _mask: u32,
    ) {
        self.log.push(Call::StencilFuncCall);
    }

    fn stencil_op(&mut self, _face: Option<StencilFace>, _fail: StencilOp, _pass: StencilOp) {
        self.log.push(Call::StencilOpCall);
    }

    fn stencil_mask(&mut self, face: Option<StencilFace>, mask: u32) {
        self.log.push(Call::StencilMask(face, mask));
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.log.push(Call::ClearColor(color));
        self.clear_color_value = color;
    }

    fn clear_stencil_value(&mut self, value: i32) {
        self.log.push(Call::ClearStencilValue(value));
    }

    fn clear(&mut self, color: bool, stencil: bool) {
        self.log.push(Call::Clear { color, stencil });
        if !color {
            return;
        }
        let value = self.clear_color_value;
        let fbo = self.bound_draw_fbo;
        let scissor_enabled = self.scissor_enabled;
        let scissor = self.scissor;
        self.with_color_pixels_mut(fbo, |pixels, w, h, bpp| {
            let region = if scissor_enabled {
                scissor
            } else {
                GlRect::from_wh(w, h)
            };
            let mut texel = [0u8; 4];
            for (i, t) in texel.iter_mut().enumerate().take(bpp.min(4)) {
                *t = (value[i].clamp(0.0, 1.0) * 255.0).round() as u8;
            }
            for y in region.bottom..(region.bottom + region.height).min(h) {
                if y < 0 {
                    continue;
                }
                for x in region.left..(region.left + region.width).min(w) {
                    if x < 0 {
                        continue;
                    }
                    let p = (y as usize * w as usize + x as usize) * bpp;
                    pixels[p..p + bpp].copy_from_slice(&texel[..bpp]);
                }
            }
        });
    }

    fn read_pixels(&mut self, rect: GlRect, config: PixelConfig, dst: &mut [u8]) {
        self.log.push(Call::ReadPixels);
        let Some((sp, sw, _sh, bpp)) = self.color_pixels(self.bound_read_fbo) else {
            return;
        };
        debug_assert_eq!(Some(bpp), config.bytes_per_pixel());
        let tight = rect.width as usize * bpp;
        let stride = if self.pack_row_length > 0 {
            self.pack_row_length as usize * bpp
        } else {
            tight
        };
        for r in 0..rect.height {
            // Output rows run bottom-up unless pack reversal is on.
            let out_row = if self.pack_reverse {
                (rect.height - 1 - r) as usize
            } else {
                r as usize
            };
            let sy = (rect.bottom + r) as usize;
            let s = (sy * sw as usize + rect.left as usize) * bpp;
            let d = out_row * stride;
            dst[d..d + tight].copy_from_slice(&sp[s..s + tight]);
        }
    }

    fn draw_elements(&mut self, _primitive: Primitive, _count: i32, _offset: usize) {
        self.log.push(Call::DrawElements);
    }

    fn draw_arrays(&mut self, _primitive: Primitive, _first: i32, _count: i32) {
        self.log.push(Call::DrawArrays);
    }
}
