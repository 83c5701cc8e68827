//! An OpenGL device layer with redundant-state elision, built on [glow].
//!
//! This crate provides [`GlDevice`], which owns the GL-side lifecycle of
//! textures, render targets, stencil buffers, and geometry/transfer buffers,
//! and flushes draw state to the driver through a shadow cache so repeated
//! state never reaches GL twice. All GL traffic goes through the
//! [`GlInterface`] trait; the `glow` feature supplies [`GlowInterface`], the
//! production backend over a [glow] context.
//!
//! # Features
//!
//! - **State shadowing**: scissor, blend, stencil, texture bindings, and
//!   framebuffer bindings are cached and only pushed when they change.
//! - **Surface origins**: top-left client coordinates are translated to GL's
//!   bottom-up convention per surface, including mirrored blits between
//!   surfaces of differing origin.
//! - **Multisample resolve** tracking with a dirty region per render target,
//!   covering blit-based, scissored-blit, and auto-resolving arrangements.
//! - **Stencil attachment sharing** with a format probe that remembers which
//!   formats the driver actually accepts.
//! - **Pixel transfer** in both directions, using row-length pixel store
//!   state where available and CPU repacking where not.
//!
//! # Safety
//!
//! Creating a [`GlowInterface`] requires a valid, current OpenGL context, and
//! the context must stay current on the calling thread for every device
//! operation built on it. The constructor is `unsafe` to record that
//! obligation; the device itself adds no other safety requirements.
//!
//! [glow]: https://docs.rs/glow

mod buffer;
mod caps;
mod device;
#[cfg(feature = "glow")]
mod glow_backend;
mod interface;
mod pixel;
mod rect;
mod render_target;
mod state;
mod stencil;
#[cfg(test)]
mod testgl;
mod texture;
mod transfer;

pub use buffer::{mapped_bytes_mut, BufferDesc, BufferUpdatePolicy, IndexBuffer, VertexBuffer};
pub use caps::{Caps, GlBinding, MapBufferType, MsFboType};
pub use device::{BackendRenderTargetDesc, BackendTextureDesc, GlDevice, Surface};
#[cfg(feature = "glow")]
pub use glow_backend::GlowInterface;
pub use interface::{
    Attachment, BlendCoeff, BufferId, BufferTarget, BufferUsageHint, Channel, CullFace, FboTarget,
    Filter, FramebufferId, GlCap, GlErrorCode, GlInterface, MapAccess, Primitive,
    RenderbufferFormat, RenderbufferId, StencilFace, StencilFunc, StencilOp, TextureId, WrapAxis,
    WrapMode,
};
pub use pixel::PixelConfig;
pub use rect::{GlRect, Rect, SurfaceOrigin};
pub use render_target::{RenderTarget, RenderTargetHandle};
pub use state::{
    DrawFace, DrawState, DrawType, SamplerState, StencilSettings, StencilSide, TextureBinding,
    NUM_TEXTURE_UNITS,
};
pub use stencil::{StencilBuffer, StencilFormat, StencilFormatKind};
pub use texture::{Texture, TextureDesc, TextureHandle};
pub use transfer::{TransferBuffer, TransferDirection};
