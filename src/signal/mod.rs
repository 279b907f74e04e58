use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

use gbridge_ffi::{RawSignalQuery, RawValue};
use tracing::{debug, trace};

use crate::config::SignalConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::object::property::c_name;
use crate::object::Object;
use crate::runtime::{self, type_name, vtable};
use crate::value::{marshal, HostValue, Value};

mod handler;

pub use handler::{handler_count, SignalHandler};

static VALIDATE_EMIT_ARGS: AtomicBool = AtomicBool::new(false);

pub fn configure(config: &SignalConfig) {
    VALIDATE_EMIT_ARGS.store(config.validate_emit_args, Ordering::Relaxed);
}

/// 信号处理器编号
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignalHandlerId(pub(crate) u64);

impl SignalHandlerId {
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl Display for SignalHandlerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Object {
    /// 发射信号并返回转换后的返回值
    ///
    /// 默认不检查参数数量与类型, 交由外部运行时报告.
    /// 开启[`SignalConfig`]的`validate_emit_args`后在发射前检查
    pub fn emit(&self, signal: &str, args: &[HostValue]) -> BridgeResult<HostValue> {
        if self.is_none() {
            return Ok(HostValue::None);
        }

        let c_signal = c_name("signal", signal)?;

        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(marshal::host_to_value(&HostValue::Object(self.clone()))?);
        for arg in args {
            values.push(marshal::host_to_value(arg)?);
        }

        let vtb = vtable();
        let signal_id = (vtb.signal_lookup)(c_signal.as_ptr(), self.type_id());

        if VALIDATE_EMIT_ARGS.load(Ordering::Relaxed) {
            self.check_emit_args(signal, signal_id, &values)?;
        }

        let raw: Vec<RawValue> = values.iter().map(Value::as_ptr).collect();
        let ret = Value::alloc()?;

        trace!(signal, signal_id, n_values = raw.len(), "emitting signal");
        (vtb.signal_emitv)(raw.as_ptr(), raw.len() as u32, signal_id, 0, ret.as_ptr());

        if ret.is_unset() {
            return Ok(HostValue::None);
        }

        marshal::value_to_host(&ret)
    }

    fn check_emit_args(&self, signal: &str, signal_id: u32, values: &[Value]) -> BridgeResult<()> {
        if signal_id == 0 {
            return Err(BridgeError::NotFound(format!(
                "signal {} on {}",
                signal,
                self.type_name()
            )));
        }

        let mut query = RawSignalQuery::default();
        (vtable().signal_query)(signal_id, &mut query);

        let params = query.param_types();
        let args = &values[1..];
        if params.len() != args.len() {
            return Err(BridgeError::TypeMismatch {
                context: format!("signal {}", signal),
                expected: format!("{} arguments", params.len()),
                actual: format!("{} arguments", args.len()),
            });
        }

        for (i, (expected, value)) in params.iter().zip(args).enumerate() {
            let actual = value.type_tag();
            if !runtime::type_is_a(actual, *expected) {
                return Err(BridgeError::TypeMismatch {
                    context: format!("argument {} of signal {}", i + 1, signal),
                    expected: type_name(*expected),
                    actual: type_name(actual),
                });
            }
        }

        Ok(())
    }

    pub fn stop_emission(&self, signal: &str) -> BridgeResult<()> {
        let Some(handle) = self.native_nonnull() else {
            return Ok(());
        };

        let c_signal = c_name("signal", signal)?;
        (vtable().signal_stop_emission_by_name)(handle, c_signal.as_ptr());

        Ok(())
    }

    /// 暂停处理器, 不断开连接
    pub fn block(&self, id: SignalHandlerId) {
        if let Some(handle) = self.native_nonnull() {
            debug!("阻塞信号处理器: {}", id);
            (vtable().signal_handler_block)(handle, id.0);
        }
    }

    pub fn unblock(&self, id: SignalHandlerId) {
        if let Some(handle) = self.native_nonnull() {
            debug!("解除阻塞信号处理器: {}", id);
            (vtable().signal_handler_unblock)(handle, id.0);
        }
    }
}
