use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use gbridge_ffi::{RawAsyncResult, RawObject};
use tracing::error;

use crate::config::AsyncConfig;
use crate::object::Object;

mod callback;
mod future;
mod result;

pub use callback::{AsyncCallbackRegistry, AsyncReadyCallback, CallbackId, Registration, UserData};
pub use future::{ready_future, AsyncReady};
pub use result::AsyncResult;

static ASYNC_CALLBACKS: OnceLock<AsyncCallbackRegistry> = OnceLock::new();

static RECLAIM_ON_DISPATCH: AtomicBool = AtomicBool::new(false);

pub fn registry() -> &'static AsyncCallbackRegistry {
    ASYNC_CALLBACKS.get_or_init(AsyncCallbackRegistry::new)
}

pub fn configure(config: &AsyncConfig) {
    RECLAIM_ON_DISPATCH.store(config.reclaim_on_dispatch, Ordering::Relaxed);
}

pub fn register<F>(callback: F, user_data: UserData) -> CallbackId
where
    F: Fn(&Object, &AsyncResult, UserData),
    F: Send + Sync + 'static,
{
    registry().register(callback, user_data)
}

pub fn unregister(id: CallbackId) -> bool {
    registry().unregister(id)
}

/// 传给外部异步调用的完成回调, `user_data`为[`CallbackId::as_user_data`]
pub extern "C" fn async_ready_trampoline(
    source: RawObject,
    result: RawAsyncResult,
    user_data: *mut (),
) {
    let Some(id) = CallbackId::from_user_data(user_data) else {
        error!("收到空的异步回调标识");
        return;
    };

    let reclaim = RECLAIM_ON_DISPATCH.load(Ordering::Relaxed);
    let Some(registration) = registry().take_for_dispatch(id, reclaim) else {
        error!("收到未知异步回调({})的完成通知", id);
        return;
    };

    let source = Object::wrap(source);
    let result = AsyncResult::wrap(result);
    let callback = registration.callback();

    if panic::catch_unwind(AssertUnwindSafe(|| {
        callback(&source, &result, registration.user_data())
    }))
    .is_err()
    {
        error!("异步回调({})发生panic", id);
    }
}
