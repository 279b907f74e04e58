use std::ptr;

use gbridge_ffi::error::RawError;
use gbridge_ffi::RawAsyncResult;

use crate::error::{BridgeError, BridgeResult, ForeignError};
use crate::object::Object;
use crate::runtime::vtable;

/// 外部异步操作的结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsyncResult {
    object: Object,
}

impl AsyncResult {
    pub fn wrap(handle: RawAsyncResult) -> Self {
        Self {
            object: Object::wrap(handle),
        }
    }

    pub fn from_object(object: Object) -> Self {
        Self { object }
    }

    pub fn as_object(&self) -> &Object {
        &self.object
    }

    pub fn into_object(self) -> Object {
        self.object
    }

    pub fn user_data(&self) -> *mut () {
        match self.object.native_nonnull() {
            Some(handle) => (vtable().async_result_get_user_data)(handle),
            None => ptr::null_mut(),
        }
    }

    pub fn source_object(&self) -> Object {
        let Some(handle) = self.object.native_nonnull() else {
            return Object::none();
        };

        // full reference, owned by us
        unsafe { Object::adopt((vtable().async_result_get_source_object)(handle)) }
    }

    /// 按地址比较
    pub fn is_tagged(&self, tag: *const ()) -> bool {
        if tag.is_null() {
            return false;
        }

        self.object
            .native_nonnull()
            .map_or(false, |handle| (vtable().async_result_is_tagged)(handle, tag))
    }

    /// 取出旧式简单结果携带的错误, 外部错误在返回前释放
    ///
    /// 返回`Ok(())`仅表示此路径没有错误, 不代表操作成功
    pub fn legacy_propagate_error(&self) -> BridgeResult<()> {
        let Some(handle) = self.object.native_nonnull() else {
            return Ok(());
        };

        let mut raw: *mut RawError = ptr::null_mut();
        if !(vtable().async_result_legacy_propagate_error)(handle, &mut raw) {
            return Ok(());
        }

        match unsafe { ForeignError::take_raw(raw) } {
            Some(err) => Err(BridgeError::Foreign(err)),
            None => Ok(()),
        }
    }
}
