use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use gbridge_ffi::{RawClosure, RawValue};
use tracing::{debug, error, warn};

use super::SignalHandlerId;
use crate::error::{BridgeError, BridgeResult, ForeignError};
use crate::object::property::c_name;
use crate::object::Object;
use crate::runtime::{type_name, vtable};
use crate::value::{marshal, HostValue, Value};

/// 信号处理器, 第一个参数为发射信号的实例
pub type SignalHandler = dyn Fn(&[HostValue]) -> Option<HostValue> + Send + Sync;

struct ClosureEntry {
    signal: String,
    handler: Box<SignalHandler>,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
struct HandlerKey {
    instance: usize,
    id: u64,
}

struct SignalRegistry {
    handlers: DashMap<HandlerKey, usize>,
    closures: DashMap<usize, Arc<ClosureEntry>>,
}

static SIGNAL_REGISTRY: OnceLock<SignalRegistry> = OnceLock::new();

fn registry() -> &'static SignalRegistry {
    SIGNAL_REGISTRY.get_or_init(|| SignalRegistry {
        handlers: DashMap::new(),
        closures: DashMap::new(),
    })
}

/// 已连接且未断开的处理器数量
pub fn handler_count() -> usize {
    registry().handlers.len()
}

impl Object {
    pub fn connect<F>(&self, signal: &str, handler: F) -> BridgeResult<SignalHandlerId>
    where
        F: Fn(&[HostValue]) -> Option<HostValue>,
        F: Send + Sync + 'static,
    {
        self.connect_closure(signal, Box::new(handler), false)
    }

    /// 在默认处理器之后执行
    pub fn connect_after<F>(&self, signal: &str, handler: F) -> BridgeResult<SignalHandlerId>
    where
        F: Fn(&[HostValue]) -> Option<HostValue>,
        F: Send + Sync + 'static,
    {
        self.connect_closure(signal, Box::new(handler), true)
    }

    fn connect_closure(
        &self,
        signal: &str,
        handler: Box<SignalHandler>,
        after: bool,
    ) -> BridgeResult<SignalHandlerId> {
        let Some(instance) = self.native_nonnull() else {
            return Err(BridgeError::NotFound(format!(
                "signal {} on a none object",
                signal
            )));
        };

        let c_signal = c_name("signal", signal)?;
        let vtb = vtable();

        let closure = (vtb.closure_new)(closure_marshal);
        if closure.is_null() {
            return Err(BridgeError::Foreign(ForeignError {
                domain: 0,
                code: 0,
                message: "unable to allocate a closure".into(),
            }));
        }

        let registry = registry();
        registry.closures.insert(
            closure as usize,
            Arc::new(ClosureEntry {
                signal: signal.to_owned(),
                handler,
            }),
        );

        let id = (vtb.signal_connect_closure)(instance, c_signal.as_ptr(), closure, after);
        if id == 0 {
            registry.closures.remove(&(closure as usize));
            (vtb.closure_invalidate)(closure);
            (vtb.closure_unref)(closure);

            return Err(BridgeError::NotFound(format!(
                "signal {} on {}",
                signal,
                self.type_name()
            )));
        }

        registry.handlers.insert(
            HandlerKey {
                instance: instance as usize,
                id,
            },
            closure as usize,
        );
        debug!("已连接信号处理器: {}::{} -> {}", self.type_name(), signal, id);

        Ok(SignalHandlerId(id))
    }

    /// 断开处理器并释放闭包
    pub fn disconnect(&self, id: SignalHandlerId) {
        let Some(instance) = self.native_nonnull() else {
            return;
        };

        let vtb = vtable();
        (vtb.signal_handler_disconnect)(instance, id.0);

        let registry = registry();
        let key = HandlerKey {
            instance: instance as usize,
            id: id.0,
        };
        let Some((_, closure)) = registry.handlers.remove(&key) else {
            warn!("未找到信号处理器({})对应的闭包", id);
            return;
        };

        let closure = closure as RawClosure;
        (vtb.closure_invalidate)(closure);
        registry.closures.remove(&(closure as usize));
        (vtb.closure_unref)(closure);

        debug!("已断开信号处理器: {}", id);
    }
}

extern "C" fn closure_marshal(
    closure: RawClosure,
    return_value: RawValue,
    n_params: u32,
    params: *const RawValue,
) {
    let entry = match registry().closures.get(&(closure as usize)) {
        Some(entry) => Arc::clone(entry.value()),
        None => {
            error!("收到未知闭包的调用: {:p}", closure);
            return;
        }
    };

    let params = if params.is_null() || n_params == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(params, n_params as usize) }
    };

    let mut args = Vec::with_capacity(params.len());
    for (i, raw) in params.iter().enumerate() {
        let Some(value) = (unsafe { Value::borrow_raw(*raw) }) else {
            args.push(HostValue::None);
            continue;
        };

        match marshal::value_to_host(&value) {
            Ok(v) => args.push(v),
            Err(e) => {
                error!("信号({})的第{}个参数转换失败: {}", entry.signal, i, e);
                return;
            }
        }
    }

    let ret = match panic::catch_unwind(AssertUnwindSafe(|| (entry.handler)(&args))) {
        Ok(ret) => ret,
        Err(_) => {
            error!("信号({})的处理器发生panic", entry.signal);
            return;
        }
    };

    let Some(ret) = ret else {
        return;
    };
    let Some(slot) = (unsafe { Value::borrow_raw(return_value) }) else {
        return;
    };

    let expected = slot.type_tag();
    let value = match marshal::host_to_value_for(&ret, expected) {
        Ok(value) => value,
        Err(e) => {
            warn!("信号({})的返回值转换失败: {}", entry.signal, e);
            return;
        }
    };

    if expected.is_valid() && expected != value.type_tag() {
        warn!(
            "信号({})的返回值类型错误: 应为{}, 实为{}",
            entry.signal,
            type_name(expected),
            value.type_name()
        );
        return;
    }

    value.copy_into(slot.as_ptr());
}
