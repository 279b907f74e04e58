use std::fmt::{Debug, Formatter};
use std::ptr::{self, NonNull};

use gbridge_ffi::{RawObject, TypeTag};
use tracing::trace;

use crate::error::BridgeResult;
use crate::runtime::{self, vtable};
use crate::value::{marshal, HostValue, Value};

pub(crate) mod property;

pub struct Object {
    ptr: Option<NonNull<()>>,
}

// The foreign reference count is atomic. Mutating one object from several
// threads at once is still up to the caller to avoid.
unsafe impl Send for Object {}

unsafe impl Sync for Object {}

impl Object {
    #[inline]
    pub const fn none() -> Self {
        Self { ptr: None }
    }

    /// 浮动引用会被接管, 否则增加引用
    pub fn wrap(handle: RawObject) -> Self {
        let Some(ptr) = NonNull::new(handle) else {
            return Self::none();
        };

        let vtb = vtable();
        if (vtb.object_is_floating)(handle) {
            trace!(handle = ?handle, "sinking floating reference");
            (vtb.object_ref_sink)(handle);
        } else {
            trace!(handle = ?handle, "taking reference");
            (vtb.object_ref)(handle);
        }

        Self { ptr: Some(ptr) }
    }

    #[inline]
    pub fn take(handle: RawObject) -> Self {
        Self::wrap(handle)
    }

    /// 接管调用者已持有的引用, 不修改引用计数
    ///
    /// # Safety
    /// 调用者须持有`handle`的一个非浮动引用
    pub unsafe fn adopt(handle: RawObject) -> Self {
        Self {
            ptr: NonNull::new(handle),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.ptr.is_none()
    }

    #[inline]
    pub fn native(&self) -> RawObject {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    #[inline]
    pub(crate) fn native_nonnull(&self) -> Option<RawObject> {
        self.ptr.map(NonNull::as_ptr)
    }

    pub fn type_id(&self) -> TypeTag {
        match self.native_nonnull() {
            Some(handle) => (vtable().type_from_instance)(handle),
            None => TypeTag::INVALID,
        }
    }

    pub fn type_name(&self) -> String {
        runtime::type_name(self.type_id())
    }

    pub fn is_instance_of(&self, tag: TypeTag) -> bool {
        if self.is_none() {
            return false;
        }

        runtime::type_is_a(self.type_id(), tag)
    }

    #[inline]
    pub fn is_a(&self, tag: TypeTag) -> bool {
        self.is_instance_of(tag)
    }

    pub fn is_floating(&self) -> bool {
        self.native_nonnull()
            .map_or(false, |handle| (vtable().object_is_floating)(handle))
    }

    pub fn force_floating(&self) {
        if let Some(handle) = self.native_nonnull() {
            (vtable().object_force_floating)(handle);
        }
    }

    /// 使用实例动态类型的转换器转换
    pub fn to_host(&self) -> BridgeResult<HostValue> {
        if self.is_none() {
            return Ok(HostValue::Object(Self::none()));
        }

        let tag = self.type_id();
        let marshaler = marshal::lookup(tag)?;
        let mut value = Value::new(tag)?;
        value.set_object(self);

        (marshaler.to_host)(&value)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::none()
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        if let Some(handle) = self.native_nonnull() {
            (vtable().object_ref)(handle);
        }

        Self { ptr: self.ptr }
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            trace!(handle = ?ptr.as_ptr(), "releasing reference");
            (vtable().object_unref)(ptr.as_ptr());
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for Object {}

impl Debug for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.ptr {
            Some(ptr) => write!(f, "Object({:p})", ptr.as_ptr()),
            None => f.write_str("Object(none)"),
        }
    }
}
