//! Geometry buffer objects and the shared buffer core.
//!
//! A buffer is backed either by a GL buffer object or by a CPU shadow
//! allocation. The CPU mode exists for platforms where mapping or frequently
//! orphaning driver buffers is slower than client-side arrays; which mode a
//! dynamic buffer gets is a capability decision made at creation time.

use std::ptr::NonNull;
use std::slice;

use crate::caps::Caps;
use crate::interface::{BufferId, BufferTarget, BufferUsageHint, GlInterface, MapAccess};
use crate::state::HwState;

/// How a partial update of a GPU-backed dynamic buffer is issued.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BufferUpdatePolicy {
    /// Orphan the storage with a null `glBufferData` of the full size, then
    /// write the new bytes with `glBufferSubData`. Avoids stalling on a
    /// buffer the GPU is still reading.
    OrphanThenSubData,
    /// Like orphaning, but every `interval`-th update replaces the whole
    /// storage with a sized `glBufferData` instead, keeping drivers that
    /// shrink orphaned allocations honest.
    PeriodicFullReplace {
        /// Updates between full replacements. Must be nonzero.
        interval: u32,
    },
}

impl Default for BufferUpdatePolicy {
    fn default() -> Self {
        Self::OrphanThenSubData
    }
}

/// Borrowed slice of device internals that buffer operations need.
pub(crate) struct BufferCtx<'a> {
    pub(crate) gl: &'a mut dyn GlInterface,
    pub(crate) caps: &'a Caps,
    pub(crate) hw: &'a mut HwState,
}

/// Description of a buffer's storage.
#[derive(Copy, Clone, Debug)]
pub struct BufferDesc {
    /// GL name; `None` means the buffer is CPU-backed.
    pub id: Option<BufferId>,
    /// Storage size in bytes.
    pub size_in_bytes: usize,
    /// Created for frequent rewriting.
    pub dynamic: bool,
    /// Wraps an externally created GL buffer the caller owns.
    pub wrapped: bool,
}

/// The mode-agnostic buffer core shared by vertex and index buffers.
///
/// Invariant: exactly one of `desc.id` and `cpu_data` is populated.
#[derive(Debug)]
pub(crate) struct BufferImpl {
    desc: BufferDesc,
    target: BufferTarget,
    cpu_data: Option<Box<[u8]>>,
    map_ptr: Option<NonNull<u8>>,
    update_count: u32,
}

impl BufferImpl {
    pub(crate) fn new_gpu(desc: BufferDesc, target: BufferTarget) -> Self {
        debug_assert!(desc.id.is_some());
        Self {
            desc,
            target,
            cpu_data: None,
            map_ptr: None,
            update_count: 0,
        }
    }

    pub(crate) fn new_cpu(size_in_bytes: usize, target: BufferTarget) -> Self {
        Self {
            desc: BufferDesc {
                id: None,
                size_in_bytes,
                dynamic: true,
                wrapped: false,
            },
            target,
            cpu_data: Some(vec![0u8; size_in_bytes].into_boxed_slice()),
            map_ptr: None,
            update_count: 0,
        }
    }

    pub(crate) fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    pub(crate) fn is_cpu_backed(&self) -> bool {
        self.cpu_data.is_some()
    }

    pub(crate) fn is_mapped(&self) -> bool {
        self.map_ptr.is_some()
    }

    fn usage(&self) -> BufferUsageHint {
        if self.desc.dynamic {
            BufferUsageHint::DynamicDraw
        } else {
            BufferUsageHint::StaticDraw
        }
    }

    /// Map the whole buffer for writing. The previous contents become
    /// undefined. Returns `None` if mapping is unsupported, the storage is
    /// zero-sized, or a map is already outstanding.
    pub(crate) fn map(&mut self, ctx: &mut BufferCtx<'_>) -> Option<NonNull<u8>> {
        if self.map_ptr.is_some() || self.desc.size_in_bytes == 0 {
            return None;
        }
        let ptr = if let Some(data) = self.cpu_data.as_mut() {
            NonNull::new(data.as_mut_ptr())?
        } else {
            if !ctx.caps.can_map_buffers() {
                return None;
            }
            let id = self.desc.id;
            ctx.hw.bind_buffer(ctx.gl, self.target, id);
            // Orphan first so the map never waits on in-flight draws.
            ctx.gl
                .buffer_data(self.target, self.desc.size_in_bytes, None, self.usage());
            ctx.gl.map_buffer_range(
                self.target,
                0,
                self.desc.size_in_bytes,
                MapAccess::WriteDiscard,
            )?
        };
        self.map_ptr = Some(ptr);
        Some(ptr)
    }

    /// Unmap a previously mapped buffer. Returns `false` when GL reports the
    /// mapped storage was lost; the contents are then undefined.
    pub(crate) fn unmap(&mut self, ctx: &mut BufferCtx<'_>) -> bool {
        debug_assert!(self.map_ptr.is_some());
        self.map_ptr = None;
        if self.cpu_data.is_some() {
            return true;
        }
        ctx.hw.bind_buffer(ctx.gl, self.target, self.desc.id);
        ctx.gl.unmap_buffer(self.target)
    }

    /// Replace the first `src.len()` bytes of the buffer. Fails (returning
    /// `false`) when `src` exceeds the storage size. The tail beyond
    /// `src.len()` is undefined after a GPU-side update.
    pub(crate) fn update_data(&mut self, ctx: &mut BufferCtx<'_>, src: &[u8]) -> bool {
        debug_assert!(self.map_ptr.is_none());
        if src.len() > self.desc.size_in_bytes {
            return false;
        }
        if let Some(data) = self.cpu_data.as_mut() {
            data[..src.len()].copy_from_slice(src);
            return true;
        }
        ctx.hw.bind_buffer(ctx.gl, self.target, self.desc.id);
        self.update_count = self.update_count.wrapping_add(1);
        if src.len() == self.desc.size_in_bytes {
            ctx.gl.buffer_data(self.target, src.len(), Some(src), self.usage());
            return true;
        }
        match ctx.caps.buffer_update_policy {
            BufferUpdatePolicy::PeriodicFullReplace { interval }
                if interval > 0 && self.update_count % interval == 0 =>
            {
                // Shrink the storage to the payload; the buffer is regrown by
                // the next orphaning update.
                ctx.gl.buffer_data(self.target, src.len(), Some(src), self.usage());
            }
            _ => {
                ctx.gl
                    .buffer_data(self.target, self.desc.size_in_bytes, None, self.usage());
                ctx.gl.buffer_sub_data(self.target, 0, src);
            }
        }
        true
    }

    /// Drop the storage, deleting the GL object when owned.
    pub(crate) fn release(&mut self, ctx: &mut BufferCtx<'_>) {
        self.map_ptr = None;
        self.cpu_data = None;
        if let Some(id) = self.desc.id.take() {
            if !self.desc.wrapped {
                ctx.gl.delete_buffer(id);
            }
            ctx.hw.notify_buffer_deleted(self.target, id);
        }
        self.desc.size_in_bytes = 0;
    }

    /// Drop the storage without touching GL (the context is gone).
    pub(crate) fn abandon(&mut self) {
        self.map_ptr = None;
        self.cpu_data = None;
        self.desc.id = None;
        self.desc.size_in_bytes = 0;
    }
}

macro_rules! geometry_buffer {
    ($(#[$doc:meta])* $name:ident, $target:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            pub(crate) raw: BufferImpl,
            valid: bool,
        }

        impl $name {
            pub(crate) fn from_raw(raw: BufferImpl) -> Self {
                debug_assert_eq!(raw.target, $target);
                Self { raw, valid: true }
            }

            /// Storage size in bytes.
            #[must_use]
            pub fn size_in_bytes(&self) -> usize {
                self.raw.desc().size_in_bytes
            }

            /// Whether the buffer still owns usable storage.
            #[must_use]
            pub fn is_valid(&self) -> bool {
                self.valid
            }

            /// Whether a map is outstanding.
            #[must_use]
            pub fn is_locked(&self) -> bool {
                self.raw.is_mapped()
            }

            /// GL name of the underlying buffer object, when GPU-backed.
            #[must_use]
            pub fn gl_id(&self) -> Option<BufferId> {
                self.raw.desc().id
            }

            /// Map the buffer for writing, discarding previous contents.
            pub fn lock<G: GlInterface>(
                &mut self,
                device: &mut crate::device::GlDevice<G>,
            ) -> Option<NonNull<u8>> {
                if !self.valid {
                    return None;
                }
                let mut ctx = device.buffer_ctx()?;
                self.raw.map(&mut ctx)
            }

            /// Pointer of the outstanding map, if any.
            #[must_use]
            pub fn lock_ptr(&self) -> Option<NonNull<u8>> {
                self.raw.map_ptr
            }

            /// End an outstanding map. Returns `false` when GL reports the
            /// mapped contents were lost.
            pub fn unlock<G: GlInterface>(
                &mut self,
                device: &mut crate::device::GlDevice<G>,
            ) -> bool {
                if !self.valid || !self.raw.is_mapped() {
                    return false;
                }
                let Some(mut ctx) = device.buffer_ctx() else {
                    self.raw.map_ptr = None;
                    return false;
                };
                self.raw.unmap(&mut ctx)
            }

            /// Replace the leading contents of the buffer with `elements`.
            pub fn update_data<G: GlInterface, T: bytemuck::Pod>(
                &mut self,
                device: &mut crate::device::GlDevice<G>,
                elements: &[T],
            ) -> bool {
                if !self.valid || self.raw.is_mapped() {
                    return false;
                }
                let Some(mut ctx) = device.buffer_ctx() else {
                    return false;
                };
                self.raw.update_data(&mut ctx, bytemuck::cast_slice(elements))
            }

            /// Free the storage. The buffer stays around as an invalid husk;
            /// all further operations fail.
            pub fn release<G: GlInterface>(
                &mut self,
                device: &mut crate::device::GlDevice<G>,
            ) {
                if !self.valid {
                    return;
                }
                self.valid = false;
                if let Some(mut ctx) = device.buffer_ctx() {
                    self.raw.release(&mut ctx);
                } else {
                    self.raw.abandon();
                }
            }

            /// Forget the storage without any GL calls.
            pub fn abandon(&mut self) {
                self.valid = false;
                self.raw.abandon();
            }
        }
    };
}

geometry_buffer!(
    /// A vertex buffer (`GL_ARRAY_BUFFER`).
    VertexBuffer,
    BufferTarget::Vertex
);
geometry_buffer!(
    /// An index buffer (`GL_ELEMENT_ARRAY_BUFFER`).
    IndexBuffer,
    BufferTarget::Index
);

impl BufferImpl {
    /// Read access to the CPU shadow, used when drawing from client memory.
    pub(crate) fn cpu_bytes(&self) -> Option<&[u8]> {
        self.cpu_data.as_deref()
    }
}

/// View the mapped bytes of an outstanding lock.
///
/// # Safety
///
/// `ptr` must be the live pointer returned by the matching `lock` call, and
/// the buffer must not be unlocked while the slice is alive.
#[must_use]
pub unsafe fn mapped_bytes_mut<'a>(ptr: NonNull<u8>, len: usize) -> &'a mut [u8] {
    unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), len) }
}
