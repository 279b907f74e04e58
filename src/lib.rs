use tracing::info;

pub mod async_ready;
pub mod config;
pub mod error;
pub mod object;
pub mod runtime;
pub mod service;
pub mod signal;
pub mod value;

pub use async_ready::{AsyncCallbackRegistry, AsyncResult, CallbackId, UserData};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult, ForeignError, LoadError};
pub use gbridge_ffi::ffi::ForeignVTable;
pub use gbridge_ffi::TypeTag;
pub use object::Object;
pub use signal::SignalHandlerId;
pub use value::{HostValue, Value};

/// 应用配置, 加载运行时动态库并注册默认转换器
///
/// 日志需另外通过[`service::log::init_logger`]初始化
pub fn init(config: &BridgeConfig) -> Result<(), LoadError> {
    if let Some(library) = &config.runtime.library {
        runtime::load_runtime(library)?;
    }

    signal::configure(&config.signal);
    async_ready::configure(&config.async_ready);
    value::register_defaults();

    info!("gbridge已初始化");
    Ok(())
}
