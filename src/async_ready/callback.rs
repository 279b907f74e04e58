use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::AsyncResult;
use crate::object::Object;

pub type AsyncReadyCallback = dyn Fn(&Object, &AsyncResult, UserData) + Send + Sync;

/// 原样交还给回调的上下文指针
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UserData(*mut ());

// Never dereferenced here, only carried back to the callback.
unsafe impl Send for UserData {}

unsafe impl Sync for UserData {}

impl UserData {
    #[inline]
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    #[inline]
    pub const fn from_ptr(ptr: *mut ()) -> Self {
        Self(ptr)
    }

    #[inline]
    pub const fn as_ptr(self) -> *mut () {
        self.0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for UserData {
    fn default() -> Self {
        Self::null()
    }
}

/// 注册编号, 作为异步调用的`user_data`传给外部运行时
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(usize);

impl CallbackId {
    #[inline]
    pub fn as_raw(self) -> usize {
        self.0
    }

    #[inline]
    pub fn as_user_data(self) -> *mut () {
        self.0 as *mut ()
    }

    /// 空指针不是有效编号
    pub fn from_user_data(ptr: *mut ()) -> Option<Self> {
        match ptr as usize {
            0 => None,
            id => Some(Self(id)),
        }
    }
}

impl Display for CallbackId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone)]
pub struct Registration {
    callback: Arc<AsyncReadyCallback>,
    user_data: UserData,
    once: bool,
}

impl Registration {
    pub fn callback(&self) -> &Arc<AsyncReadyCallback> {
        &self.callback
    }

    pub fn user_data(&self) -> UserData {
        self.user_data
    }

    pub fn is_once(&self) -> bool {
        self.once
    }
}

struct RegistryInner {
    next: usize,
    entries: HashMap<usize, Registration>,
}

/// 以编号为键的`(回调, user_data)`表
///
/// 回调总在释放锁之后执行
pub struct AsyncCallbackRegistry {
    inner: Mutex<RegistryInner>,
}

impl AsyncCallbackRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next: 1,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 条目保留至[`AsyncCallbackRegistry::unregister`], 或在开启回收时保留至首次分发
    pub fn register<F>(&self, callback: F, user_data: UserData) -> CallbackId
    where
        F: Fn(&Object, &AsyncResult, UserData),
        F: Send + Sync + 'static,
    {
        self.insert(Arc::new(callback), user_data, false)
    }

    /// 分发一次后即移除
    pub fn register_once<F>(&self, callback: F, user_data: UserData) -> CallbackId
    where
        F: Fn(&Object, &AsyncResult, UserData),
        F: Send + Sync + 'static,
    {
        self.insert(Arc::new(callback), user_data, true)
    }

    fn insert(
        &self,
        callback: Arc<AsyncReadyCallback>,
        user_data: UserData,
        once: bool,
    ) -> CallbackId {
        let mut inner = self.lock();
        let id = inner.next;
        inner.next += 1;
        inner.entries.insert(
            id,
            Registration {
                callback,
                user_data,
                once,
            },
        );
        let len = inner.entries.len();
        drop(inner);

        debug!("已注册异步回调: {}, 当前共{}个", id, len);
        CallbackId(id)
    }

    pub fn resolve(&self, id: CallbackId) -> Option<Registration> {
        self.lock().entries.get(&id.0).cloned()
    }

    pub fn unregister(&self, id: CallbackId) -> bool {
        let removed = self.lock().entries.remove(&id.0).is_some();
        if removed {
            debug!("已移除异步回调: {}", id);
        }

        removed
    }

    pub(crate) fn take_for_dispatch(&self, id: CallbackId, reclaim: bool) -> Option<Registration> {
        let mut inner = self.lock();
        let once = inner.entries.get(&id.0)?.once;

        if once || reclaim {
            inner.entries.remove(&id.0)
        } else {
            inner.entries.get(&id.0).cloned()
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AsyncCallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
