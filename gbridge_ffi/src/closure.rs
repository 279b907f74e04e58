use crate::{RawAsyncResult, RawClosure, RawObject, RawValue};

/// `params`的第一个值为发射信号的实例, 无返回值的信号`return_value`为空
pub type ClosureMarshal = extern "C" fn(
    closure: RawClosure,
    return_value: RawValue,
    n_params: u32,
    params: *const RawValue,
);

/// 异步操作完成时调用, `source`可能为空
pub type AsyncReadyCallback =
    extern "C" fn(source: RawObject, result: RawAsyncResult, user_data: *mut ());
