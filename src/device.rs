//! The device: owns the GL interface, the capability snapshot, the state
//! cache, and the texture/render-target registries, and issues every GL call
//! in the crate.
//!
//! All methods are fail-soft once the context is abandoned: they stop
//! touching GL and return failure, so teardown after a context loss is safe
//! in any order.

use std::collections::HashSet;

use crate::buffer::{BufferCtx, BufferDesc, BufferImpl, IndexBuffer, VertexBuffer};
use crate::caps::{Caps, GlBinding, MsFboType};
use crate::interface::{
    Attachment, BlendCoeff, BufferTarget, BufferUsageHint, Channel, CullFace, FboTarget, Filter,
    FramebufferId, GlCap, GlInterface, Primitive, RenderbufferFormat, StencilFace, TextureId,
    WrapAxis,
};
use crate::pixel::PixelConfig;
use crate::rect::{GlRect, Rect, SurfaceOrigin};
use crate::render_target::{RenderTarget, RenderTargetHandle, ResolveType};
use crate::state::{Cached, DrawState, DrawType, HwState, TriState, SPARE_TEXTURE_UNIT};
use crate::stencil::{StencilBuffer, StencilFormat, StencilFormatKind};
use crate::texture::{TexParams, Texture, TextureDesc, TextureHandle};
use crate::transfer::{TransferBuffer, TransferDirection};

/// An externally created texture to wrap.
#[derive(Copy, Clone, Debug)]
pub struct BackendTextureDesc {
    /// GL name of the texture, owned by the caller.
    pub id: TextureId,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Pixel format.
    pub config: PixelConfig,
    /// Samples for the attached render target, when one is requested.
    pub sample_count: u32,
    /// Also create a render target drawing into the texture.
    pub render_target: bool,
    /// Row origin of the texture's contents.
    pub origin: SurfaceOrigin,
}

/// An externally created framebuffer to wrap as a render target.
#[derive(Copy, Clone, Debug)]
pub struct BackendRenderTargetDesc {
    /// GL framebuffer name; `None` is the window-system framebuffer.
    pub fbo: Option<FramebufferId>,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Pixel format.
    pub config: PixelConfig,
    /// Sample count; 0 or 1 means single-sampled.
    pub sample_count: u32,
    /// Stencil bits already attached, 0 for none.
    pub stencil_bits: u32,
    /// Row origin; window-system targets are bottom-up.
    pub origin: SurfaceOrigin,
}

/// A copyable surface: a texture or a render target.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Surface {
    /// Copy to or from a texture (reads go through its render target, when
    /// it has one).
    Texture(TextureHandle),
    /// Copy to or from a render target.
    RenderTarget(RenderTargetHandle),
}

enum CopyPath {
    TexSubImage,
    Blit,
    CpuRoundTrip,
}

struct SurfInfo {
    width: i32,
    height: i32,
    config: PixelConfig,
    origin: SurfaceOrigin,
    /// FBO carrying the resolved pixels; outer `None` means not readable.
    read_fbo: Option<Option<FramebufferId>>,
    /// FBO blits may write into; excluded for targets whose draw storage is
    /// a separate multisample buffer.
    draw_fbo: Option<Option<FramebufferId>>,
    tex_id: Option<TextureId>,
    tex_handle: Option<TextureHandle>,
    rt: Option<RenderTargetHandle>,
}

fn drain_errors(gl: &mut dyn GlInterface) {
    while gl.get_error().is_some() {}
}

/// Drain the error queue after an allocating call; any pending error means
/// the allocation is treated as failed.
fn alloc_failed(gl: &mut dyn GlInterface) -> bool {
    let mut failed = false;
    while gl.get_error().is_some() {
        failed = true;
    }
    failed
}

/// GL device frontend, generic over the raw call interface.
pub struct GlDevice<G: GlInterface> {
    gl: G,
    caps: Caps,
    hw: HwState,
    textures: Vec<Option<Texture>>,
    render_targets: Vec<Option<RenderTarget>>,
    next_unique_id: u64,
    /// Start index for the stencil format probe; remembers the last format
    /// that worked so later attachments try it first.
    last_stencil_format_idx: usize,
    /// Color configs whose framebuffer attachment has passed a completeness
    /// check; later attachments of the same config skip the check.
    verified_color_configs: HashSet<PixelConfig>,
    /// (color config, stencil format) pairs known to make a complete FBO.
    verified_stencil_pairs: HashSet<(PixelConfig, StencilFormatKind)>,
    abandoned: bool,
}

impl<G: GlInterface> GlDevice<G> {
    /// Wrap a GL interface whose context is current on this thread.
    pub fn new(gl: G, caps: Caps) -> Self {
        let mut hw = HwState::default();
        // Start above zero so wrapped textures (timestamp 0) always look
        // stale on first use.
        hw.reset_timestamp = 1;
        Self {
            gl,
            caps,
            hw,
            textures: Vec::new(),
            render_targets: Vec::new(),
            next_unique_id: 1,
            last_stencil_format_idx: 0,
            verified_color_configs: HashSet::new(),
            verified_stencil_pairs: HashSet::new(),
            abandoned: false,
        }
    }

    /// The platform capability snapshot.
    #[must_use]
    pub fn caps(&self) -> &Caps {
        &self.caps
    }

    /// Whether the context has been abandoned.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// External code has touched GL state behind the device's back; forget
    /// all cached state.
    pub fn reset_context(&mut self) {
        self.hw.invalidate();
    }

    /// The context has been lost. All further GL calls are suppressed;
    /// resources release as no-ops.
    pub fn context_abandoned(&mut self) {
        self.abandoned = true;
        self.hw.invalidate();
        for tex in self.textures.iter_mut().flatten() {
            tex.id = None;
        }
        for rt in self.render_targets.iter_mut().flatten() {
            rt.draw_fbo = None;
            rt.resolve_fbo = None;
            rt.ms_color_renderbuffer = None;
            if let Some(sb) = rt.stencil.as_mut() {
                sb.renderbuffer = None;
            }
        }
    }

    /// Look up a texture by handle.
    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.0).and_then(Option::as_ref)
    }

    /// Look up a render target by handle.
    #[must_use]
    pub fn render_target(&self, handle: RenderTargetHandle) -> Option<&RenderTarget> {
        self.render_targets.get(handle.0).and_then(Option::as_ref)
    }

    pub(crate) fn buffer_ctx(&mut self) -> Option<BufferCtx<'_>> {
        if self.abandoned {
            return None;
        }
        Some(BufferCtx {
            gl: &mut self.gl,
            caps: &self.caps,
            hw: &mut self.hw,
        })
    }

    #[cfg(test)]
    pub(crate) fn gl_mut(&mut self) -> &mut G {
        &mut self.gl
    }

    fn alloc_unique_id(&mut self) -> u64 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    fn insert_texture(&mut self, tex: Texture) -> TextureHandle {
        if let Some(i) = self.textures.iter().position(Option::is_none) {
            self.textures[i] = Some(tex);
            TextureHandle(i)
        } else {
            self.textures.push(Some(tex));
            TextureHandle(self.textures.len() - 1)
        }
    }

    fn insert_render_target(&mut self, rt: RenderTarget) -> RenderTargetHandle {
        if let Some(i) = self.render_targets.iter().position(Option::is_none) {
            self.render_targets[i] = Some(rt);
            RenderTargetHandle(i)
        } else {
            self.render_targets.push(Some(rt));
            RenderTargetHandle(self.render_targets.len() - 1)
        }
    }

    // Buffers.

    /// Create a vertex buffer of `size_in_bytes`.
    pub fn create_vertex_buffer(&mut self, size_in_bytes: usize, dynamic: bool) -> Option<VertexBuffer> {
        self.create_geometry_buffer(size_in_bytes, dynamic, BufferTarget::Vertex)
            .map(VertexBuffer::from_raw)
    }

    /// Create an index buffer of `size_in_bytes`.
    pub fn create_index_buffer(&mut self, size_in_bytes: usize, dynamic: bool) -> Option<IndexBuffer> {
        self.create_geometry_buffer(size_in_bytes, dynamic, BufferTarget::Index)
            .map(IndexBuffer::from_raw)
    }

    fn create_geometry_buffer(
        &mut self,
        size_in_bytes: usize,
        dynamic: bool,
        target: BufferTarget,
    ) -> Option<BufferImpl> {
        if self.abandoned || size_in_bytes == 0 {
            return None;
        }
        if dynamic && self.caps.use_cpu_shadow_for_dynamic_buffers {
            return Some(BufferImpl::new_cpu(size_in_bytes, target));
        }
        let id = self.gl.gen_buffer()?;
        let Self { gl, caps, hw, .. } = self;
        hw.bind_buffer(&mut *gl, target, Some(id));
        if caps.check_alloc_with_get_error {
            drain_errors(&mut *gl);
        }
        let usage = if dynamic {
            BufferUsageHint::DynamicDraw
        } else {
            BufferUsageHint::StaticDraw
        };
        gl.buffer_data(target, size_in_bytes, None, usage);
        if caps.check_alloc_with_get_error && alloc_failed(&mut *gl) {
            gl.delete_buffer(id);
            hw.notify_buffer_deleted(target, id);
            return None;
        }
        Some(BufferImpl::new_gpu(
            BufferDesc {
                id: Some(id),
                size_in_bytes,
                dynamic,
                wrapped: false,
            },
            target,
        ))
    }

    /// Create a pixel transfer buffer. Fails on platforms without pack/unpack
    /// buffer or mapping support.
    pub fn create_transfer_buffer(
        &mut self,
        size_in_bytes: usize,
        direction: TransferDirection,
    ) -> Option<TransferBuffer> {
        if self.abandoned
            || size_in_bytes == 0
            || !self.caps.transfer_buffers
            || !self.caps.can_map_buffers()
        {
            return None;
        }
        let id = self.gl.gen_buffer()?;
        let target = direction.target();
        let usage = match direction {
            TransferDirection::CpuToGpu => BufferUsageHint::StreamDraw,
            TransferDirection::GpuToCpu => BufferUsageHint::StreamRead,
        };
        let gl = &mut self.gl;
        gl.bind_buffer(target, Some(id));
        if self.caps.check_alloc_with_get_error {
            drain_errors(gl);
        }
        gl.buffer_data(target, size_in_bytes, None, usage);
        let failed = self.caps.check_alloc_with_get_error && alloc_failed(gl);
        gl.bind_buffer(target, None);
        if failed {
            gl.delete_buffer(id);
            return None;
        }
        Some(TransferBuffer::from_raw(id, size_in_bytes, direction))
    }

    // Textures.

    /// Create a texture, optionally initialized from client pixels and
    /// optionally backed by a render target.
    pub fn create_texture(
        &mut self,
        desc: TextureDesc,
        data: Option<&[u8]>,
        row_bytes: usize,
    ) -> Option<TextureHandle> {
        if self.abandoned || desc.width <= 0 || desc.height <= 0 {
            return None;
        }
        let max = if desc.render_target {
            self.caps.max_render_target_size
        } else {
            self.caps.max_texture_size
        };
        if desc.width > max || desc.height > max {
            return None;
        }
        if desc.config == PixelConfig::Bgra8888 && !self.caps.bgra {
            return None;
        }
        if desc.config.is_compressed() && desc.render_target {
            return None;
        }
        let samples = desc.sample_count.min(self.caps.max_sample_count);
        if samples > 1 && (self.caps.ms_fbo_type == MsFboType::None || !desc.render_target) {
            return None;
        }
        let origin = if desc.render_target {
            SurfaceOrigin::BottomLeft
        } else {
            SurfaceOrigin::TopLeft
        };

        let id = self.gl.gen_texture()?;
        let unique_id = self.alloc_unique_id();
        {
            let Self { gl, hw, .. } = self;
            hw.set_active_unit(&mut *gl, SPARE_TEXTURE_UNIT);
            gl.bind_texture(Some(id));
            hw.bound_textures[SPARE_TEXTURE_UNIT as usize] = Cached::Known(unique_id);
            // Push the parameters the snapshot records; GL's own defaults
            // differ (wrap defaults to repeat).
            gl.tex_filter(Filter::Nearest);
            gl.tex_wrap(WrapAxis::S, crate::interface::WrapMode::Clamp);
            gl.tex_wrap(WrapAxis::T, crate::interface::WrapMode::Clamp);
        }
        let ok = if desc.config.is_compressed() {
            match (data, desc.config.compressed_size(desc.width, desc.height)) {
                (Some(d), Some(size)) if d.len() >= size => {
                    self.gl
                        .compressed_tex_image_2d(desc.config, desc.width, desc.height, &d[..size]);
                    true
                }
                _ => false,
            }
        } else {
            Self::upload_tex_data(
                &mut self.gl,
                &self.caps,
                desc.width,
                desc.height,
                origin,
                true,
                Rect::from_wh(desc.width, desc.height),
                desc.config,
                data,
                row_bytes,
            )
        };
        if !ok {
            self.gl.delete_texture(id);
            self.hw.notify_texture_deleted(unique_id);
            return None;
        }

        let handle = self.insert_texture(Texture {
            id: Some(id),
            wrapped: false,
            desc: TextureDesc {
                sample_count: samples,
                ..desc
            },
            origin,
            unique_id,
            cached_params: TexParams::initial(),
            params_timestamp: self.hw.reset_timestamp,
            mips_dirty: data.is_some(),
            render_target: None,
        });
        if desc.render_target {
            match self.create_render_target_objects(id, Some(handle), desc.width, desc.height, desc.config, samples)
            {
                Some(rth) => {
                    if let Some(tex) = self.textures.get_mut(handle.0).and_then(Option::as_mut) {
                        tex.render_target = Some(rth);
                    }
                }
                None => {
                    self.release_texture(handle);
                    return None;
                }
            }
        }
        Some(handle)
    }

    /// Wrap a caller-owned GL texture. The texture is never deleted by the
    /// device and its parameters are assumed unknown.
    pub fn wrap_backend_texture(&mut self, desc: BackendTextureDesc) -> Option<TextureHandle> {
        if self.abandoned || desc.width <= 0 || desc.height <= 0 {
            return None;
        }
        let samples = desc.sample_count.min(self.caps.max_sample_count);
        if samples > 1 && self.caps.ms_fbo_type == MsFboType::None {
            return None;
        }
        let unique_id = self.alloc_unique_id();
        let handle = self.insert_texture(Texture {
            id: Some(desc.id),
            wrapped: true,
            desc: TextureDesc {
                width: desc.width,
                height: desc.height,
                config: desc.config,
                sample_count: samples,
                render_target: desc.render_target,
            },
            origin: desc.origin,
            unique_id,
            cached_params: TexParams::initial(),
            // Timestamp 0 predates every reset, so the snapshot reads as
            // stale and the params are pushed before first use.
            params_timestamp: 0,
            mips_dirty: true,
            render_target: None,
        });
        if desc.render_target {
            match self.create_render_target_objects(
                desc.id,
                Some(handle),
                desc.width,
                desc.height,
                desc.config,
                samples,
            ) {
                Some(rth) => {
                    if let Some(tex) = self.textures.get_mut(handle.0).and_then(Option::as_mut) {
                        tex.render_target = Some(rth);
                    }
                }
                None => {
                    self.release_texture(handle);
                    return None;
                }
            }
        }
        Some(handle)
    }

    /// Wrap a caller-owned framebuffer (or the window-system framebuffer) as
    /// a render target.
    pub fn wrap_backend_render_target(
        &mut self,
        desc: BackendRenderTargetDesc,
    ) -> Option<RenderTargetHandle> {
        if self.abandoned || desc.width <= 0 || desc.height <= 0 {
            return None;
        }
        let unique_id = self.alloc_unique_id();
        let stencil = (desc.stencil_bits > 0).then(|| StencilBuffer {
            renderbuffer: None,
            wrapped: true,
            width: desc.width,
            height: desc.height,
            sample_count: desc.sample_count,
            format: StencilFormat {
                kind: StencilFormatKind::UnsizedIndex,
                stencil_bits: Some(desc.stencil_bits),
                total_bits: Some(desc.stencil_bits),
                packed: false,
            },
        });
        Some(self.insert_render_target(RenderTarget {
            draw_fbo: desc.fbo,
            resolve_fbo: None,
            ms_color_renderbuffer: None,
            sample_count: desc.sample_count,
            origin: desc.origin,
            config: desc.config,
            width: desc.width,
            height: desc.height,
            stencil,
            dirty_region: None,
            unique_id,
            owned: false,
            texture: None,
        }))
    }

    fn create_render_target_objects(
        &mut self,
        tex_id: TextureId,
        texture: Option<TextureHandle>,
        width: i32,
        height: i32,
        config: PixelConfig,
        sample_count: u32,
    ) -> Option<RenderTargetHandle> {
        let separate = sample_count > 1;
        let draw_fbo = self.gl.gen_framebuffer()?;
        let mut resolve_fbo = None;
        let mut ms_rb = None;
        let mut ok = true;

        if separate {
            match (self.gl.gen_framebuffer(), self.gl.gen_renderbuffer()) {
                (Some(f), Some(rb)) => {
                    resolve_fbo = Some(f);
                    ms_rb = Some(rb);
                }
                (f, rb) => {
                    if let Some(f) = f {
                        self.gl.delete_framebuffer(f);
                    }
                    if let Some(rb) = rb {
                        self.gl.delete_renderbuffer(rb);
                    }
                    ok = false;
                }
            }
        }

        if ok {
            if let Some(rb) = ms_rb {
                self.gl.bind_renderbuffer(Some(rb));
                if self.caps.check_alloc_with_get_error {
                    drain_errors(&mut self.gl);
                }
                self.gl.renderbuffer_storage_multisample(
                    sample_count,
                    RenderbufferFormat::Color(config),
                    width,
                    height,
                );
                if self.caps.check_alloc_with_get_error && alloc_failed(&mut self.gl) {
                    ok = false;
                }
                if ok {
                    self.gl.bind_framebuffer(FboTarget::Both, Some(draw_fbo));
                    self.hw.dirty_render_target();
                    self.gl.framebuffer_renderbuffer(Attachment::Color, Some(rb));
                    ok = self.check_color_attachment(config);
                }
                if ok {
                    self.gl.bind_framebuffer(FboTarget::Both, resolve_fbo);
                    self.gl.framebuffer_texture_2d(Attachment::Color, Some(tex_id));
                    ok = self.check_color_attachment(config);
                }
            } else {
                self.gl.bind_framebuffer(FboTarget::Both, Some(draw_fbo));
                self.hw.dirty_render_target();
                self.gl.framebuffer_texture_2d(Attachment::Color, Some(tex_id));
                ok = self.check_color_attachment(config);
            }
        }

        if !ok {
            self.gl.delete_framebuffer(draw_fbo);
            if let Some(f) = resolve_fbo {
                self.gl.delete_framebuffer(f);
            }
            if let Some(rb) = ms_rb {
                self.gl.delete_renderbuffer(rb);
            }
            return None;
        }
        let unique_id = self.alloc_unique_id();
        Some(self.insert_render_target(RenderTarget {
            draw_fbo: Some(draw_fbo),
            resolve_fbo,
            ms_color_renderbuffer: ms_rb,
            sample_count,
            origin: SurfaceOrigin::BottomLeft,
            config,
            width,
            height,
            stencil: None,
            dirty_region: None,
            unique_id,
            owned: true,
            texture,
        }))
    }

    /// Completeness check for a color attachment of `config`, skipped once a
    /// previous attachment of the same config has passed.
    fn check_color_attachment(&mut self, config: PixelConfig) -> bool {
        if self.verified_color_configs.contains(&config) {
            return true;
        }
        if self.gl.check_framebuffer_complete() {
            self.verified_color_configs.insert(config);
            true
        } else {
            false
        }
    }

    // Stencil attachment.

    /// Create and attach a stencil buffer to `handle`, probing the platform's
    /// candidate formats until one both allocates and makes the framebuffer
    /// complete. Succeeds immediately when a stencil buffer is already
    /// attached.
    pub fn attach_stencil_buffer(&mut self, handle: RenderTargetHandle) -> bool {
        if self.abandoned {
            return false;
        }
        let Some(rt) = self.render_target(handle) else {
            return false;
        };
        if rt.stencil.is_some() {
            return true;
        }
        let (width, height, samples, config, draw_fbo) =
            (rt.width, rt.height, rt.sample_count, rt.config, rt.draw_fbo);
        let Some(rb) = self.gl.gen_renderbuffer() else {
            return false;
        };
        let format_count = self.caps.stencil_formats.len();
        for attempt in 0..format_count {
            let idx = (self.last_stencil_format_idx + attempt) % format_count;
            let kind = self.caps.stencil_formats[idx];
            {
                let Self { gl, caps, .. } = self;
                gl.bind_renderbuffer(Some(rb));
                if caps.check_alloc_with_get_error {
                    drain_errors(&mut *gl);
                }
                if samples > 1 {
                    gl.renderbuffer_storage_multisample(
                        samples.min(caps.max_sample_count),
                        RenderbufferFormat::Stencil(kind),
                        width,
                        height,
                    );
                } else {
                    gl.renderbuffer_storage(RenderbufferFormat::Stencil(kind), width, height);
                }
                if caps.check_alloc_with_get_error && alloc_failed(&mut *gl) {
                    continue;
                }
            }
            let mut format = StencilFormat::sized(kind);
            self.gl.bind_framebuffer(FboTarget::Both, draw_fbo);
            self.hw.dirty_render_target();
            self.gl.framebuffer_renderbuffer(Attachment::Stencil, Some(rb));
            if format.packed {
                self.gl.framebuffer_renderbuffer(Attachment::Depth, Some(rb));
            }
            if !self.verified_stencil_pairs.contains(&(config, kind)) {
                if !self.gl.check_framebuffer_complete() {
                    self.gl.framebuffer_renderbuffer(Attachment::Stencil, None);
                    if format.packed {
                        self.gl.framebuffer_renderbuffer(Attachment::Depth, None);
                    }
                    continue;
                }
                self.verified_stencil_pairs.insert((config, kind));
            }
            if kind == StencilFormatKind::UnsizedIndex {
                let bits = self.gl.get_renderbuffer_bits(Attachment::Stencil);
                format.stencil_bits = Some(bits);
                format.total_bits = Some(bits);
            }
            self.last_stencil_format_idx = idx;
            let stencil = StencilBuffer {
                renderbuffer: Some(rb),
                wrapped: false,
                width,
                height,
                sample_count: samples,
                format,
            };
            if let Some(rt) = self.render_targets.get_mut(handle.0).and_then(Option::as_mut) {
                rt.stencil = Some(stencil);
            }
            return true;
        }
        self.gl.delete_renderbuffer(rb);
        false
    }

    // Pixel upload.

    /// Push a pixel rectangle into the texture bound on the active unit.
    /// `is_new` allocates level 0 (the region must then be the whole
    /// texture); otherwise the region is updated in place.
    #[allow(clippy::too_many_arguments)]
    fn upload_tex_data(
        gl: &mut G,
        caps: &Caps,
        tex_width: i32,
        tex_height: i32,
        origin: SurfaceOrigin,
        is_new: bool,
        region: Rect,
        config: PixelConfig,
        data: Option<&[u8]>,
        row_bytes: usize,
    ) -> bool {
        let Some(bpp) = config.bytes_per_pixel() else {
            return false;
        };
        let bounds = Rect::from_wh(tex_width, tex_height);
        if region.is_empty() || !bounds.contains(&region) {
            return false;
        }
        let whole = region == bounds;
        if is_new && !whole {
            return false;
        }
        let tight = region.width as usize * bpp;
        let row_bytes = if row_bytes == 0 { tight } else { row_bytes };
        if row_bytes < tight {
            return false;
        }
        // 565 is not a legal sized internal format on desktop GL, which
        // rules immutable storage out for it there.
        let use_tex_storage = is_new
            && caps.tex_storage
            && !(caps.binding == GlBinding::Desktop && config == PixelConfig::Rgb565);
        let sized = caps.binding == GlBinding::Desktop
            || (config == PixelConfig::Bgra8888 && caps.bgra_is_internal_format);

        let Some(data) = data else {
            // Allocation only.
            if !is_new {
                return false;
            }
            if caps.check_alloc_with_get_error {
                drain_errors(&mut *gl);
            }
            if use_tex_storage {
                gl.tex_storage_2d(config, tex_width, tex_height);
            } else {
                gl.tex_image_2d(config, sized, tex_width, tex_height, None);
            }
            return !(caps.check_alloc_with_get_error && alloc_failed(&mut *gl));
        };

        let rows = region.height as usize;
        if data.len() < (rows - 1) * row_bytes + tight {
            return false;
        }
        let flip = origin == SurfaceOrigin::BottomLeft;
        let gl_flip = flip && caps.unpack_flip_y;
        let sw_flip = flip && !caps.unpack_flip_y;
        let needs_stride = row_bytes != tight;
        let use_row_length = needs_stride && caps.unpack_row_length && row_bytes % bpp == 0;

        // A software flip repacks tight rows, so padded input never reaches
        // the row-length path in that case.
        let row_length_set = use_row_length && !sw_flip;

        let repacked;
        let upload: &[u8] = if sw_flip || (needs_stride && !use_row_length) {
            let mut tmp = Vec::with_capacity(rows * tight);
            for r in 0..rows {
                let src_row = if sw_flip { rows - 1 - r } else { r };
                let start = src_row * row_bytes;
                tmp.extend_from_slice(&data[start..start + tight]);
            }
            repacked = tmp;
            &repacked
        } else {
            if row_length_set {
                gl.set_unpack_row_length((row_bytes / bpp) as i32);
            }
            &data[..(rows - 1) * row_bytes + tight]
        };
        if gl_flip {
            gl.set_unpack_flip_y(true);
        }
        gl.set_unpack_alignment(match bpp {
            1 => 1,
            2 => 2,
            _ => 4,
        });
        let gl_bottom = match origin {
            SurfaceOrigin::TopLeft => region.top,
            SurfaceOrigin::BottomLeft => tex_height - region.top - region.height,
        };

        let mut ok = true;
        if is_new {
            if caps.check_alloc_with_get_error {
                drain_errors(&mut *gl);
            }
            if use_tex_storage {
                gl.tex_storage_2d(config, tex_width, tex_height);
                ok = !(caps.check_alloc_with_get_error && alloc_failed(&mut *gl));
                if ok {
                    gl.tex_sub_image_2d(0, 0, tex_width, tex_height, config, upload);
                }
            } else {
                gl.tex_image_2d(config, sized, tex_width, tex_height, Some(upload));
                ok = !(caps.check_alloc_with_get_error && alloc_failed(&mut *gl));
            }
        } else {
            gl.tex_sub_image_2d(region.left, gl_bottom, region.width, region.height, config, upload);
        }

        if row_length_set {
            gl.set_unpack_row_length(0);
        }
        if gl_flip {
            gl.set_unpack_flip_y(false);
        }
        ok
    }

    /// Replace a pixel rectangle of a texture with client pixels (top-down
    /// rows, `row_bytes` apart).
    pub fn write_texture_pixels(
        &mut self,
        handle: TextureHandle,
        region: Rect,
        config: PixelConfig,
        data: &[u8],
        row_bytes: usize,
    ) -> bool {
        if self.abandoned {
            return false;
        }
        let Some(tex) = self.texture(handle) else {
            return false;
        };
        if tex.desc.config.is_compressed() || config != tex.desc.config {
            return false;
        }
        let Some(id) = tex.id else {
            return false;
        };
        let (w, h, origin, uid) = (tex.desc.width, tex.desc.height, tex.origin, tex.unique_id);
        {
            let Self { gl, hw, .. } = self;
            hw.set_active_unit(&mut *gl, SPARE_TEXTURE_UNIT);
            gl.bind_texture(Some(id));
            hw.bound_textures[SPARE_TEXTURE_UNIT as usize] = Cached::Known(uid);
        }
        let ok = Self::upload_tex_data(
            &mut self.gl,
            &self.caps,
            w,
            h,
            origin,
            false,
            region,
            config,
            Some(data),
            row_bytes,
        );
        if ok {
            if let Some(tex) = self.textures.get_mut(handle.0).and_then(Option::as_mut) {
                tex.mips_dirty = true;
            }
        }
        ok
    }

    // State flush.

    /// Push `state` to GL ahead of a draw, issuing only the calls whose
    /// cached value differs. Returns `false` when the draw should be skipped
    /// (clipped-out scissor, missing resources, or stencil requested on a
    /// target without stencil bits).
    pub fn flush_state(&mut self, state: &DrawState, draw_type: DrawType) -> bool {
        if self.abandoned {
            return false;
        }

        // Sampled textures backed by unresolved render targets resolve
        // before they are read.
        for binding in state.textures.iter().flatten() {
            let Some(tex) = self.texture(binding.texture) else {
                return false;
            };
            if let Some(rth) = tex.render_target {
                if self.render_target(rth).is_some_and(RenderTarget::needs_resolve) {
                    self.resolve_render_target(rth);
                }
            }
        }
        for (unit, binding) in state.textures.iter().enumerate() {
            let Some(binding) = binding else { continue };
            if !self.flush_texture_unit(unit, binding.texture, &binding.sampler) {
                return false;
            }
        }

        let Some(rt) = self.render_target(state.render_target) else {
            return false;
        };
        let bounds = rt.bounds();
        let viewport = rt.viewport();
        let origin = rt.origin;
        let stencil_bits = rt.stencil().map_or(0, StencilBuffer::bits);
        if !self.flush_render_target_binding(state.render_target) {
            return false;
        }

        // Scissor. A rect covering the whole target disables the test
        // instead; an empty clip means nothing to draw.
        let scissor = match state.scissor {
            Some(r) => {
                let Some(clipped) = r.intersect(&bounds) else {
                    return false;
                };
                if clipped == bounds {
                    None
                } else {
                    Some(clipped)
                }
            }
            None => None,
        };
        {
            let Self { gl, hw, .. } = self;
            match scissor {
                Some(c) => {
                    hw.set_enabled(&mut *gl, GlCap::ScissorTest, true);
                    let rect = GlRect::relative_to(viewport, c, origin);
                    if hw.scissor_rect.set(rect) {
                        gl.scissor(rect);
                    }
                }
                None => hw.set_enabled(&mut *gl, GlCap::ScissorTest, false),
            }

            // Blend. The identity pair means blending is off entirely.
            let identity =
                state.src_blend == BlendCoeff::One && state.dst_blend == BlendCoeff::Zero;
            if identity {
                hw.set_enabled(&mut *gl, GlCap::Blend, false);
            } else {
                hw.set_enabled(&mut *gl, GlCap::Blend, true);
                if hw.blend_coeffs.set((state.src_blend, state.dst_blend)) {
                    gl.blend_func(state.src_blend, state.dst_blend);
                }
                if (state.src_blend.references_constant() || state.dst_blend.references_constant())
                    && hw.blend_constant.set(state.blend_constant)
                {
                    gl.blend_color(state.blend_constant);
                }
            }

            hw.set_enabled(&mut *gl, GlCap::Dither, state.dither);
            let want = if state.color_write { TriState::Yes } else { TriState::No };
            if hw.color_write != want {
                gl.color_mask(state.color_write);
                hw.color_write = want;
            }
            if hw.draw_face.set(state.draw_face) {
                match state.draw_face {
                    crate::state::DrawFace::Both => gl.disable(GlCap::CullFace),
                    crate::state::DrawFace::Ccw => {
                        gl.enable(GlCap::CullFace);
                        gl.cull_face(CullFace::Back);
                    }
                    crate::state::DrawFace::Cw => {
                        gl.enable(GlCap::CullFace);
                        gl.cull_face(CullFace::Front);
                    }
                }
            }
        }

        // Stencil, except for draws that manage it themselves.
        if draw_type == DrawType::Color {
            match state.stencil {
                Some(settings) => {
                    if stencil_bits == 0 {
                        return false;
                    }
                    if self.hw.stencil.set(Some(settings)) {
                        self.gl.enable(GlCap::StencilTest);
                        if self.caps.two_sided_stencil {
                            for (face, side) in [
                                (StencilFace::Front, settings.front),
                                (StencilFace::Back, settings.back),
                            ] {
                                self.gl
                                    .stencil_func(Some(face), side.func, side.reference, side.func_mask);
                                self.gl.stencil_op(Some(face), side.fail_op, side.pass_op);
                                self.gl.stencil_mask(Some(face), side.write_mask);
                            }
                        } else {
                            let side = settings.front;
                            self.gl
                                .stencil_func(None, side.func, side.reference, side.func_mask);
                            self.gl.stencil_op(None, side.fail_op, side.pass_op);
                            self.gl.stencil_mask(None, side.write_mask);
                        }
                    }
                }
                None => {
                    if self.hw.stencil.set(None) {
                        self.gl.disable(GlCap::StencilTest);
                    }
                }
            }
        }

        if let Some(rt) = self
            .render_targets
            .get_mut(state.render_target.0)
            .and_then(Option::as_mut)
        {
            rt.flag_needs_resolve(scissor.as_ref());
        }
        true
    }

    fn flush_texture_unit(
        &mut self,
        unit: usize,
        handle: TextureHandle,
        sampler: &crate::state::SamplerState,
    ) -> bool {
        let Self { gl, hw, caps, textures, .. } = self;
        let Some(tex) = textures.get_mut(handle.0).and_then(Option::as_mut) else {
            return false;
        };
        let Some(id) = tex.id else {
            return false;
        };
        let swizzle = if sampler.swap_red_blue && caps.texture_swizzle {
            [Channel::Blue, Channel::Green, Channel::Red, Channel::Alpha]
        } else if tex.desc.config.is_alpha_only() && caps.texture_red && caps.texture_swizzle {
            // Alpha-only data stored in the red channel samples as (0,0,0,a).
            [Channel::Zero, Channel::Zero, Channel::Zero, Channel::Red]
        } else {
            TexParams::IDENTITY_SWIZZLE
        };
        let desired = TexParams {
            filter: sampler.filter,
            wrap_s: sampler.wrap_x,
            wrap_t: sampler.wrap_y,
            swizzle,
        };

        hw.set_active_unit(&mut *gl, unit as u32);
        if hw.bound_textures[unit].set(tex.unique_id) {
            gl.bind_texture(Some(id));
        }
        if sampler.filter == Filter::MipMap && tex.mips_dirty {
            gl.generate_mipmaps();
            tex.mips_dirty = false;
        }
        let stale = tex.params_timestamp < hw.reset_timestamp;
        if stale || desired.filter != tex.cached_params.filter {
            gl.tex_filter(desired.filter);
        }
        if stale || desired.wrap_s != tex.cached_params.wrap_s {
            gl.tex_wrap(WrapAxis::S, desired.wrap_s);
        }
        if stale || desired.wrap_t != tex.cached_params.wrap_t {
            gl.tex_wrap(WrapAxis::T, desired.wrap_t);
        }
        if caps.texture_swizzle && (stale || desired.swizzle != tex.cached_params.swizzle) {
            gl.tex_swizzle(desired.swizzle);
        }
        tex.cached_params = desired;
        tex.params_timestamp = hw.reset_timestamp;
        true
    }

    fn flush_render_target_binding(&mut self, handle: RenderTargetHandle) -> bool {
        let Self { gl, hw, render_targets, .. } = self;
        let Some(rt) = render_targets.get(handle.0).and_then(Option::as_ref) else {
            return false;
        };
        if hw.bound_render_target.set(rt.unique_id) {
            gl.bind_framebuffer(FboTarget::Both, rt.draw_fbo);
        }
        let vp = rt.viewport();
        if hw.viewport.set(vp) {
            gl.viewport(vp);
        }
        true
    }

    // Resolve.

    /// Copy the accumulated dirty region of a multisampled target's draw
    /// buffer into its resolved texture. No-op when nothing is dirty.
    pub fn resolve_render_target(&mut self, handle: RenderTargetHandle) {
        if self.abandoned {
            return;
        }
        let Some(rt) = self.render_target(handle) else {
            return;
        };
        if !rt.needs_resolve() {
            return;
        }
        let resolve_type = rt.resolve_type(&self.caps);
        let Some(dirty) = rt.dirty_region else {
            return;
        };
        let viewport = rt.viewport();
        let origin = rt.origin;
        let draw_fbo = rt.draw_fbo;
        let resolve_fbo = rt.resolve_fbo;

        if resolve_type == ResolveType::CanResolve {
            let rect = GlRect::relative_to(viewport, dirty, origin);
            let Self { gl, hw, caps, .. } = self;
            gl.bind_framebuffer(FboTarget::Read, draw_fbo);
            gl.bind_framebuffer(FboTarget::Draw, resolve_fbo);
            hw.dirty_render_target();
            match caps.ms_fbo_type {
                MsFboType::ResolvePrimitive => {
                    // The resolve primitive is constrained by the scissor.
                    hw.set_enabled(&mut *gl, GlCap::ScissorTest, true);
                    if hw.scissor_rect.set(rect) {
                        gl.scissor(rect);
                    }
                    gl.resolve_multisample_framebuffer();
                }
                MsFboType::ScissoredBlit => {
                    // This blit flavor honors the scissor, which must not
                    // clip the resolve.
                    hw.set_enabled(&mut *gl, GlCap::ScissorTest, false);
                    gl.blit_framebuffer(rect, rect, false);
                }
                _ => {
                    gl.blit_framebuffer(rect, rect, false);
                }
            }
        }
        if let Some(rt) = self.render_targets.get_mut(handle.0).and_then(Option::as_mut) {
            rt.flag_resolved();
        }
    }

    // Readback.

    fn bind_for_read(gl: &mut G, hw: &mut HwState, caps: &Caps, fbo: Option<FramebufferId>) {
        if caps.ms_fbo_type == MsFboType::None {
            gl.bind_framebuffer(FboTarget::Both, fbo);
            hw.dirty_render_target();
        } else {
            gl.bind_framebuffer(FboTarget::Read, fbo);
        }
    }

    /// Read back a pixel rectangle of a render target into `dst` as top-down
    /// rows `row_bytes` apart (0 means tight). The rect is clipped to the
    /// target; `dst` is written at the corresponding offsets and row padding
    /// is preserved.
    pub fn read_render_target_pixels(
        &mut self,
        handle: RenderTargetHandle,
        rect: Rect,
        config: PixelConfig,
        dst: &mut [u8],
        row_bytes: usize,
    ) -> bool {
        if self.abandoned || rect.is_empty() {
            return false;
        }
        let Some(bpp) = config.bytes_per_pixel() else {
            return false;
        };
        let Some(rt) = self.render_target(handle) else {
            return false;
        };
        if rt.config != config {
            return false;
        }
        let bounds = rt.bounds();
        let viewport = rt.viewport();
        let origin = rt.origin;
        let rect_tight = rect.width as usize * bpp;
        let row_bytes = if row_bytes == 0 { rect_tight } else { row_bytes };
        if row_bytes < rect_tight
            || dst.len() < (rect.height as usize - 1) * row_bytes + rect_tight
        {
            return false;
        }
        let Some(clip) = rect.intersect(&bounds) else {
            return false;
        };
        let dst_offset =
            (clip.top - rect.top) as usize * row_bytes + (clip.left - rect.left) as usize * bpp;

        self.resolve_render_target(handle);
        let Some(rt) = self.render_target(handle) else {
            return false;
        };
        let read_fbo = if rt.has_separate_resolve() {
            rt.resolve_fbo
        } else {
            rt.draw_fbo
        };
        let gl_rect = GlRect::relative_to(viewport, clip, origin);
        let inverted = origin == SurfaceOrigin::BottomLeft;
        let clip_tight = clip.width as usize * bpp;
        let rows = clip.height as usize;

        let Self { gl, hw, caps, .. } = self;
        Self::bind_for_read(&mut *gl, hw, caps, read_fbo);

        let native_flip = inverted && caps.pack_flip_y;
        if native_flip {
            gl.set_pack_reverse_row_order(true);
        }
        let use_row_length = row_bytes != clip_tight && caps.pack_row_length && row_bytes % bpp == 0;
        if row_bytes == clip_tight || use_row_length {
            if use_row_length {
                gl.set_pack_row_length((row_bytes / bpp) as i32);
            }
            let end = dst_offset + (rows - 1) * row_bytes + clip_tight;
            gl.read_pixels(gl_rect, config, &mut dst[dst_offset..end]);
            if use_row_length {
                gl.set_pack_row_length(0);
            }
            if native_flip {
                gl.set_pack_reverse_row_order(false);
            } else if inverted {
                // GL handed the rows back bottom-up; swap them in place,
                // leaving any row padding untouched.
                let mut tmp = vec![0u8; clip_tight];
                let (mut lo, mut hi) = (0, rows - 1);
                while lo < hi {
                    let a = dst_offset + lo * row_bytes;
                    let b = dst_offset + hi * row_bytes;
                    tmp.copy_from_slice(&dst[a..a + clip_tight]);
                    dst.copy_within(b..b + clip_tight, a);
                    dst[b..b + clip_tight].copy_from_slice(&tmp);
                    lo += 1;
                    hi -= 1;
                }
            }
        } else {
            // No row-length support: read tight into scratch, then translate
            // the stride (and the row order) in one pass.
            let mut scratch = vec![0u8; rows * clip_tight];
            gl.read_pixels(gl_rect, config, &mut scratch);
            if native_flip {
                gl.set_pack_reverse_row_order(false);
            }
            for r in 0..rows {
                let src_row = if inverted && !native_flip { rows - 1 - r } else { r };
                let s = src_row * clip_tight;
                let d = dst_offset + r * row_bytes;
                dst[d..d + clip_tight].copy_from_slice(&scratch[s..s + clip_tight]);
            }
        }
        true
    }

    // Surface copies.

    fn surface_info(&self, surface: Surface) -> Option<SurfInfo> {
        match surface {
            Surface::Texture(h) => {
                let tex = self.texture(h)?;
                let rt = tex.render_target.and_then(|r| self.render_target(r));
                Some(SurfInfo {
                    width: tex.desc.width,
                    height: tex.desc.height,
                    config: tex.desc.config,
                    origin: tex.origin,
                    read_fbo: rt.map(|r| {
                        if r.has_separate_resolve() {
                            r.resolve_fbo
                        } else {
                            r.draw_fbo
                        }
                    }),
                    draw_fbo: rt.and_then(|r| {
                        (!r.has_separate_resolve()).then_some(r.draw_fbo)
                    }),
                    tex_id: tex.id,
                    tex_handle: Some(h),
                    rt: tex.render_target,
                })
            }
            Surface::RenderTarget(h) => {
                let rt = self.render_target(h)?;
                let tex = rt.texture.and_then(|t| self.texture(t));
                Some(SurfInfo {
                    width: rt.width,
                    height: rt.height,
                    config: rt.config,
                    origin: rt.origin,
                    read_fbo: Some(if rt.has_separate_resolve() {
                        rt.resolve_fbo
                    } else {
                        rt.draw_fbo
                    }),
                    draw_fbo: (!rt.has_separate_resolve()).then_some(rt.draw_fbo),
                    tex_id: tex.and_then(|t| t.id),
                    tex_handle: rt.texture,
                    rt: Some(h),
                })
            }
        }
    }

    fn copy_path(&self, dst: &SurfInfo, src: &SurfInfo, overlapping: bool) -> Option<CopyPath> {
        if src.config != dst.config || src.config.is_compressed() {
            return None;
        }
        // ES can't CopyTexSubImage into BGRA unless BGRA is a real internal
        // format there.
        let bgra_blocked = dst.config == PixelConfig::Bgra8888
            && self.caps.binding == GlBinding::Es
            && !self.caps.bgra_is_internal_format;
        if dst.tex_id.is_some() && src.read_fbo.is_some() && dst.origin == src.origin && !bgra_blocked
        {
            return Some(CopyPath::TexSubImage);
        }
        let blit_capable = matches!(
            self.caps.ms_fbo_type,
            MsFboType::Standard | MsFboType::ScissoredBlit
        );
        if blit_capable && src.read_fbo.is_some() && dst.draw_fbo.is_some() && !overlapping {
            return Some(CopyPath::Blit);
        }
        if dst.tex_id.is_some() && src.rt.is_some() && src.config.bytes_per_pixel().is_some() {
            return Some(CopyPath::CpuRoundTrip);
        }
        None
    }

    fn clip_copy(
        dst: &SurfInfo,
        src: &SurfInfo,
        src_rect: Rect,
        dst_point: (i32, i32),
    ) -> Option<(Rect, Rect)> {
        let sr = src_rect.intersect(&Rect::from_wh(src.width, src.height))?;
        let dp = (
            dst_point.0 + (sr.left - src_rect.left),
            dst_point.1 + (sr.top - src_rect.top),
        );
        let dr = Rect::from_xywh(dp.0, dp.1, sr.width, sr.height)
            .intersect(&Rect::from_wh(dst.width, dst.height))?;
        let sr = Rect::from_xywh(
            sr.left + (dr.left - dp.0),
            sr.top + (dr.top - dp.1),
            dr.width,
            dr.height,
        );
        Some((sr, dr))
    }

    /// Whether [`copy_surface`](Self::copy_surface) can copy between these
    /// surfaces at all.
    #[must_use]
    pub fn can_copy_surface(
        &self,
        dst: Surface,
        src: Surface,
        src_rect: Rect,
        dst_point: (i32, i32),
    ) -> bool {
        if self.abandoned {
            return false;
        }
        let (Some(d), Some(s)) = (self.surface_info(dst), self.surface_info(src)) else {
            return false;
        };
        let Some((sr, dr)) = Self::clip_copy(&d, &s, src_rect, dst_point) else {
            return false;
        };
        let overlapping = dst == src && sr.intersect(&dr).is_some();
        self.copy_path(&d, &s, overlapping).is_some()
    }

    /// Copy `src_rect` of `src` to `dst` at `dst_point`, clipping both to
    /// their surfaces. Picks the cheapest available mechanism: on-GPU
    /// `CopyTexSubImage2D`, a framebuffer blit, or a CPU round trip.
    pub fn copy_surface(
        &mut self,
        dst: Surface,
        src: Surface,
        src_rect: Rect,
        dst_point: (i32, i32),
    ) -> bool {
        if self.abandoned {
            return false;
        }
        let (Some(d), Some(s)) = (self.surface_info(dst), self.surface_info(src)) else {
            return false;
        };
        let Some((sr, dr)) = Self::clip_copy(&d, &s, src_rect, dst_point) else {
            return false;
        };
        let overlapping = dst == src && sr.intersect(&dr).is_some();
        let Some(path) = self.copy_path(&d, &s, overlapping) else {
            return false;
        };
        if let Some(src_rt) = s.rt {
            self.resolve_render_target(src_rt);
        }
        let src_vp = GlRect::from_wh(s.width, s.height);
        let dst_vp = GlRect::from_wh(d.width, d.height);
        match path {
            CopyPath::TexSubImage => {
                let Some(tex_id) = d.tex_id else {
                    return false;
                };
                let Some(read_fbo) = s.read_fbo else {
                    return false;
                };
                {
                    let Self { gl, hw, caps, .. } = self;
                    Self::bind_for_read(&mut *gl, hw, caps, read_fbo);
                    hw.set_active_unit(&mut *gl, SPARE_TEXTURE_UNIT);
                    gl.bind_texture(Some(tex_id));
                    hw.bound_textures[SPARE_TEXTURE_UNIT as usize] = Cached::Unknown;
                    let src_gl = GlRect::relative_to(src_vp, sr, s.origin);
                    let dst_bottom = match d.origin {
                        SurfaceOrigin::TopLeft => dr.top,
                        SurfaceOrigin::BottomLeft => d.height - dr.top - dr.height,
                    };
                    gl.copy_tex_sub_image_2d(dr.left, dst_bottom, src_gl);
                }
            }
            CopyPath::Blit => {
                let (Some(read_fbo), Some(draw_fbo)) = (s.read_fbo, d.draw_fbo) else {
                    return false;
                };
                let Self { gl, hw, caps: _, .. } = self;
                hw.set_enabled(&mut *gl, GlCap::ScissorTest, false);
                gl.bind_framebuffer(FboTarget::Read, read_fbo);
                gl.bind_framebuffer(FboTarget::Draw, draw_fbo);
                hw.dirty_render_target();
                let src_gl = GlRect::relative_to(src_vp, sr, s.origin);
                let dst_gl = GlRect::relative_to(dst_vp, dr, d.origin);
                gl.blit_framebuffer(src_gl, dst_gl, s.origin != d.origin);
            }
            CopyPath::CpuRoundTrip => {
                let Some(src_rt) = s.rt else {
                    return false;
                };
                let Some(bpp) = s.config.bytes_per_pixel() else {
                    return false;
                };
                let mut tmp = vec![0u8; sr.width as usize * sr.height as usize * bpp];
                if !self.read_render_target_pixels(src_rt, sr, s.config, &mut tmp, 0) {
                    return false;
                }
                let Some(tex_id) = d.tex_id else {
                    return false;
                };
                {
                    let Self { gl, hw, .. } = self;
                    hw.set_active_unit(&mut *gl, SPARE_TEXTURE_UNIT);
                    gl.bind_texture(Some(tex_id));
                    hw.bound_textures[SPARE_TEXTURE_UNIT as usize] = Cached::Unknown;
                }
                if !Self::upload_tex_data(
                    &mut self.gl,
                    &self.caps,
                    d.width,
                    d.height,
                    d.origin,
                    false,
                    dr,
                    d.config,
                    Some(&tmp),
                    0,
                ) {
                    return false;
                }
            }
        }
        if let Some(th) = d.tex_handle {
            if let Some(tex) = self.textures.get_mut(th.0).and_then(Option::as_mut) {
                tex.mips_dirty = true;
            }
        }
        true
    }

    // Clears.

    /// Clear a render target's color buffer to `color`. `rect` restricts the
    /// clear via the scissor; `can_ignore_rect` lets the device clear the
    /// whole target instead when that is cheaper.
    pub fn clear(
        &mut self,
        handle: RenderTargetHandle,
        rect: Option<Rect>,
        color: [f32; 4],
        can_ignore_rect: bool,
    ) {
        if self.abandoned {
            return;
        }
        let Some(rt) = self.render_target(handle) else {
            return;
        };
        let bounds = rt.bounds();
        let viewport = rt.viewport();
        let origin = rt.origin;
        let clipped = match rect {
            Some(r) if !can_ignore_rect => match r.intersect(&bounds) {
                Some(c) if c != bounds => Some(c),
                Some(_) => None,
                None => return,
            },
            _ => None,
        };
        if !self.flush_render_target_binding(handle) {
            return;
        }
        {
            let Self { gl, hw, .. } = self;
            match clipped {
                Some(c) => {
                    hw.set_enabled(&mut *gl, GlCap::ScissorTest, true);
                    let rect = GlRect::relative_to(viewport, c, origin);
                    if hw.scissor_rect.set(rect) {
                        gl.scissor(rect);
                    }
                }
                None => hw.set_enabled(&mut *gl, GlCap::ScissorTest, false),
            }
            if hw.color_write != TriState::Yes {
                gl.color_mask(true);
                hw.color_write = TriState::Yes;
            }
            gl.clear_color(color);
            gl.clear(true, false);
        }
        if let Some(rt) = self.render_targets.get_mut(handle.0).and_then(Option::as_mut) {
            rt.flag_needs_resolve(clipped.as_ref());
        }
    }

    /// Clear the whole stencil buffer to zero.
    pub fn clear_stencil(&mut self, handle: RenderTargetHandle) {
        if self.abandoned || !self.flush_render_target_binding(handle) {
            return;
        }
        let Self { gl, hw, .. } = self;
        hw.set_enabled(&mut *gl, GlCap::ScissorTest, false);
        gl.stencil_mask(None, u32::MAX);
        hw.stencil = Cached::Unknown;
        gl.clear_stencil_value(0);
        gl.clear(false, true);
    }

    /// Set or clear the clip bit (the stencil buffer's most significant bit)
    /// within `rect`, leaving the other bits alone.
    pub fn clear_stencil_clip(
        &mut self,
        handle: RenderTargetHandle,
        rect: Rect,
        inside_mask: bool,
    ) -> bool {
        if self.abandoned {
            return false;
        }
        let Some(rt) = self.render_target(handle) else {
            return false;
        };
        let bits = rt.stencil().map_or(0, StencilBuffer::bits);
        if bits == 0 {
            return false;
        }
        let viewport = rt.viewport();
        let origin = rt.origin;
        let clip_bit = 1u32 << (bits - 1);
        let value = if inside_mask { clip_bit } else { 0 };
        if !self.flush_render_target_binding(handle) {
            return false;
        }
        let Self { gl, hw, .. } = self;
        hw.set_enabled(&mut *gl, GlCap::ScissorTest, true);
        let gl_rect = GlRect::relative_to(viewport, rect, origin);
        if hw.scissor_rect.set(gl_rect) {
            gl.scissor(gl_rect);
        }
        gl.stencil_mask(None, clip_bit);
        hw.stencil = Cached::Unknown;
        gl.clear_stencil_value(value as i32);
        gl.clear(false, true);
        true
    }

    /// Tell the driver the target's contents are no longer needed, and drop
    /// any pending resolve.
    pub fn discard(&mut self, handle: RenderTargetHandle) {
        if self.abandoned {
            return;
        }
        if self.caps.discard_framebuffer {
            if self.flush_render_target_binding(handle) {
                self.gl.invalidate_framebuffer(&[Attachment::Color]);
            }
        }
        if let Some(rt) = self.render_targets.get_mut(handle.0).and_then(Option::as_mut) {
            rt.flag_resolved();
        }
    }

    // Geometry and draws.

    /// Bind the vertex (and optionally index) buffer for the next draw.
    /// CPU-shadowed buffers cannot be drawn from and fail here.
    pub fn bind_geometry(&mut self, vertex: &VertexBuffer, index: Option<&IndexBuffer>) -> bool {
        if self.abandoned || !vertex.is_valid() {
            return false;
        }
        let Some(vid) = vertex.gl_id() else {
            return false;
        };
        let iid = match index {
            Some(ib) => {
                if !ib.is_valid() {
                    return false;
                }
                match ib.gl_id() {
                    Some(id) => Some(id),
                    None => return false,
                }
            }
            None => None,
        };
        let Self { gl, hw, .. } = self;
        hw.bind_buffer(&mut *gl, BufferTarget::Vertex, Some(vid));
        if let Some(iid) = iid {
            hw.bind_buffer(&mut *gl, BufferTarget::Index, Some(iid));
        }
        true
    }

    /// Issue an indexed draw from the bound buffers.
    pub fn draw_indexed(&mut self, primitive: Primitive, index_count: i32, byte_offset: usize) {
        if !self.abandoned {
            self.gl.draw_elements(primitive, index_count, byte_offset);
        }
    }

    /// Issue a non-indexed draw from the bound vertex buffer.
    pub fn draw_arrays(&mut self, primitive: Primitive, first: i32, count: i32) {
        if !self.abandoned {
            self.gl.draw_arrays(primitive, first, count);
        }
    }

    // Releases.

    /// Delete a texture (and its render target, when it has one).
    pub fn release_texture(&mut self, handle: TextureHandle) {
        let Some(tex) = self.textures.get_mut(handle.0).and_then(Option::take) else {
            return;
        };
        if let Some(rth) = tex.render_target {
            self.release_render_target(rth);
        }
        self.hw.notify_texture_deleted(tex.unique_id);
        if let Some(id) = tex.id {
            if !tex.wrapped && !self.abandoned {
                self.gl.delete_texture(id);
            }
        }
    }

    /// Delete a render target's framebuffers and renderbuffers.
    pub fn release_render_target(&mut self, handle: RenderTargetHandle) {
        let Some(rt) = self.render_targets.get_mut(handle.0).and_then(Option::take) else {
            return;
        };
        self.hw.notify_render_target_deleted(rt.unique_id);
        if !self.abandoned {
            if rt.owned {
                if let Some(f) = rt.draw_fbo {
                    self.gl.delete_framebuffer(f);
                }
                if let Some(f) = rt.resolve_fbo {
                    self.gl.delete_framebuffer(f);
                }
                if let Some(rb) = rt.ms_color_renderbuffer {
                    self.gl.delete_renderbuffer(rb);
                }
            }
            if let Some(sb) = rt.stencil {
                if !sb.wrapped {
                    if let Some(rb) = sb.renderbuffer {
                        self.gl.delete_renderbuffer(rb);
                    }
                }
            }
        }
        if let Some(th) = rt.texture {
            if let Some(tex) = self.textures.get_mut(th.0).and_then(Option::as_mut) {
                tex.render_target = None;
            }
        }
    }
}
