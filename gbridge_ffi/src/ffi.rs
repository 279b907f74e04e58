use std::ffi::c_char;

use crate::closure::ClosureMarshal;
use crate::error::RawError;
use crate::{RawAsyncResult, RawClosure, RawObject, RawParamSpec, RawSignalQuery, RawValue, TypeTag};

/// 外部运行时函数表, 每个进程安装一次
///
/// 所有权约定:
/// - `object_ref_sink`接管浮动引用, 对非浮动对象等同`object_ref`
/// - `value_get_object`与`value_get_string`返回借用, `value_set_object`自行增加引用, `value_set_string`复制字符串
/// - `closure_new`返回的引用归调用者, `signal_connect_closure`另持有一个, 由`signal_handler_disconnect`释放
/// - `async_result_get_source_object`返回新引用
/// - `async_result_legacy_propagate_error`返回的错误须由调用者用`error_free`释放一次
#[repr(C)]
pub struct ForeignVTable {
    // type system
    pub type_is_a: extern "C" fn(TypeTag, TypeTag) -> bool,
    pub type_fundamental: extern "C" fn(TypeTag) -> TypeTag,
    pub type_name: extern "C" fn(TypeTag) -> *const c_char,
    pub type_from_instance: extern "C" fn(RawObject) -> TypeTag,

    // object lifecycle
    pub object_ref: extern "C" fn(RawObject) -> RawObject,
    pub object_unref: extern "C" fn(RawObject),
    pub object_ref_sink: extern "C" fn(RawObject) -> RawObject,
    pub object_is_floating: extern "C" fn(RawObject) -> bool,
    pub object_force_floating: extern "C" fn(RawObject),

    // properties
    pub object_find_property: extern "C" fn(RawObject, *const c_char) -> *const RawParamSpec,
    pub object_get_property: extern "C" fn(RawObject, *const c_char, RawValue),
    pub object_set_property: extern "C" fn(RawObject, *const c_char, RawValue),

    // values
    pub value_new: extern "C" fn(TypeTag) -> RawValue,
    pub value_free: extern "C" fn(RawValue),
    pub value_type: extern "C" fn(RawValue) -> TypeTag,
    pub value_copy: extern "C" fn(src: RawValue, dest: RawValue),
    pub value_get_boolean: extern "C" fn(RawValue) -> bool,
    pub value_set_boolean: extern "C" fn(RawValue, bool),
    pub value_get_char: extern "C" fn(RawValue) -> i8,
    pub value_set_char: extern "C" fn(RawValue, i8),
    pub value_get_uchar: extern "C" fn(RawValue) -> u8,
    pub value_set_uchar: extern "C" fn(RawValue, u8),
    pub value_get_int: extern "C" fn(RawValue) -> i32,
    pub value_set_int: extern "C" fn(RawValue, i32),
    pub value_get_uint: extern "C" fn(RawValue) -> u32,
    pub value_set_uint: extern "C" fn(RawValue, u32),
    pub value_get_long: extern "C" fn(RawValue) -> i64,
    pub value_set_long: extern "C" fn(RawValue, i64),
    pub value_get_ulong: extern "C" fn(RawValue) -> u64,
    pub value_set_ulong: extern "C" fn(RawValue, u64),
    pub value_get_int64: extern "C" fn(RawValue) -> i64,
    pub value_set_int64: extern "C" fn(RawValue, i64),
    pub value_get_uint64: extern "C" fn(RawValue) -> u64,
    pub value_set_uint64: extern "C" fn(RawValue, u64),
    pub value_get_enum: extern "C" fn(RawValue) -> i32,
    pub value_set_enum: extern "C" fn(RawValue, i32),
    pub value_get_flags: extern "C" fn(RawValue) -> u32,
    pub value_set_flags: extern "C" fn(RawValue, u32),
    pub value_get_float: extern "C" fn(RawValue) -> f32,
    pub value_set_float: extern "C" fn(RawValue, f32),
    pub value_get_double: extern "C" fn(RawValue) -> f64,
    pub value_set_double: extern "C" fn(RawValue, f64),
    pub value_get_string: extern "C" fn(RawValue) -> *const c_char,
    pub value_set_string: extern "C" fn(RawValue, *const c_char),
    pub value_get_pointer: extern "C" fn(RawValue) -> *mut (),
    pub value_set_pointer: extern "C" fn(RawValue, *mut ()),
    pub value_get_object: extern "C" fn(RawValue) -> RawObject,
    pub value_set_object: extern "C" fn(RawValue, RawObject),

    // signals
    pub signal_lookup: extern "C" fn(*const c_char, TypeTag) -> u32,
    pub signal_query: extern "C" fn(u32, *mut RawSignalQuery),
    pub signal_emitv: extern "C" fn(
        values: *const RawValue,
        n_values: u32,
        signal_id: u32,
        detail: u32,
        return_value: RawValue,
    ),
    pub signal_stop_emission_by_name: extern "C" fn(RawObject, *const c_char),
    pub signal_connect_closure:
        extern "C" fn(RawObject, *const c_char, RawClosure, after: bool) -> u64,
    pub signal_handler_block: extern "C" fn(RawObject, u64),
    pub signal_handler_unblock: extern "C" fn(RawObject, u64),
    pub signal_handler_disconnect: extern "C" fn(RawObject, u64),
    pub closure_new: extern "C" fn(ClosureMarshal) -> RawClosure,
    pub closure_invalidate: extern "C" fn(RawClosure),
    pub closure_unref: extern "C" fn(RawClosure),

    // async results
    pub async_result_get_user_data: extern "C" fn(RawAsyncResult) -> *mut (),
    pub async_result_get_source_object: extern "C" fn(RawAsyncResult) -> RawObject,
    pub async_result_is_tagged: extern "C" fn(RawAsyncResult, *const ()) -> bool,
    pub async_result_legacy_propagate_error:
        extern "C" fn(RawAsyncResult, *mut *mut RawError) -> bool,
    pub error_free: extern "C" fn(*mut RawError),
}

/// 外部运行时动态库导出的函数表符号
pub const VTABLE_ENTRY_SYMBOL: &[u8] = b"gbridge_foreign_vtable\0";

pub type VTableEntry = extern "C" fn() -> *const ForeignVTable;
