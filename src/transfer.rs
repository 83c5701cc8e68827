//! Pixel transfer buffers.
//!
//! Staging buffers bound to the pixel pack/unpack targets, mapped by the
//! caller to stream pixel data to or from the GPU. Unlike geometry buffers
//! these are always real GL buffer objects; creation fails outright on
//! platforms without pack/unpack buffer support.

use std::ptr::NonNull;

use crate::buffer::BufferCtx;
use crate::interface::{BufferId, BufferTarget, BufferUsageHint, GlInterface, MapAccess};

/// Which way a transfer buffer moves data.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TransferDirection {
    /// Pixel unpack: written by the CPU, consumed by texture uploads.
    CpuToGpu,
    /// Pixel pack: written by readback, read by the CPU.
    GpuToCpu,
}

impl TransferDirection {
    pub(crate) fn target(self) -> BufferTarget {
        match self {
            Self::CpuToGpu => BufferTarget::PixelUnpack,
            Self::GpuToCpu => BufferTarget::PixelPack,
        }
    }

    fn usage(self) -> BufferUsageHint {
        match self {
            Self::CpuToGpu => BufferUsageHint::StreamDraw,
            Self::GpuToCpu => BufferUsageHint::StreamRead,
        }
    }
}

/// A staging buffer for pixel transfers.
#[derive(Debug)]
pub struct TransferBuffer {
    id: Option<BufferId>,
    size_in_bytes: usize,
    direction: TransferDirection,
    map_ptr: Option<NonNull<u8>>,
}

impl TransferBuffer {
    pub(crate) fn from_raw(id: BufferId, size_in_bytes: usize, direction: TransferDirection) -> Self {
        Self {
            id: Some(id),
            size_in_bytes,
            direction,
            map_ptr: None,
        }
    }

    /// Storage size in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    /// Transfer direction the buffer was created for.
    #[must_use]
    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    /// GL name of the buffer object, `None` once released.
    #[must_use]
    pub fn gl_id(&self) -> Option<BufferId> {
        self.id
    }

    /// Whether a map is outstanding.
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.map_ptr.is_some()
    }

    pub(crate) fn map_raw(&mut self, ctx: &mut BufferCtx<'_>) -> Option<NonNull<u8>> {
        if self.map_ptr.is_some() {
            return None;
        }
        let id = self.id?;
        let target = self.direction.target();
        ctx.gl.bind_buffer(target, Some(id));
        let access = match self.direction {
            TransferDirection::CpuToGpu => {
                // Orphan so a map never waits on a pending upload.
                ctx.gl
                    .buffer_data(target, self.size_in_bytes, None, self.direction.usage());
                MapAccess::WriteDiscard
            }
            TransferDirection::GpuToCpu => MapAccess::Read,
        };
        let ptr = ctx.gl.map_buffer_range(target, 0, self.size_in_bytes, access);
        ctx.gl.bind_buffer(target, None);
        self.map_ptr = ptr;
        ptr
    }

    pub(crate) fn unmap_raw(&mut self, ctx: &mut BufferCtx<'_>) -> bool {
        debug_assert!(self.map_ptr.is_some());
        self.map_ptr = None;
        let Some(id) = self.id else { return false };
        let target = self.direction.target();
        ctx.gl.bind_buffer(target, Some(id));
        let ok = ctx.gl.unmap_buffer(target);
        ctx.gl.bind_buffer(target, None);
        ok
    }

    pub(crate) fn release_raw(&mut self, ctx: &mut BufferCtx<'_>) {
        self.map_ptr = None;
        if let Some(id) = self.id.take() {
            ctx.gl.delete_buffer(id);
        }
        self.size_in_bytes = 0;
    }

    /// Forget the storage without any GL calls.
    pub fn abandon(&mut self) {
        self.map_ptr = None;
        self.id = None;
        self.size_in_bytes = 0;
    }

    /// Map the buffer. For [`TransferDirection::CpuToGpu`] the previous
    /// contents become undefined; for [`TransferDirection::GpuToCpu`] the
    /// mapping is read-only.
    pub fn map<G: GlInterface>(
        &mut self,
        device: &mut crate::device::GlDevice<G>,
    ) -> Option<NonNull<u8>> {
        let mut ctx = device.buffer_ctx()?;
        self.map_raw(&mut ctx)
    }

    /// End an outstanding map.
    pub fn unmap<G: GlInterface>(&mut self, device: &mut crate::device::GlDevice<G>) -> bool {
        if !self.is_mapped() {
            return false;
        }
        let Some(mut ctx) = device.buffer_ctx() else {
            self.map_ptr = None;
            return false;
        };
        self.unmap_raw(&mut ctx)
    }

    /// Delete the GL object.
    pub fn release<G: GlInterface>(&mut self, device: &mut crate::device::GlDevice<G>) {
        if let Some(mut ctx) = device.buffer_ctx() {
            self.release_raw(&mut ctx);
        } else {
            self.abandon();
        }
    }
}
