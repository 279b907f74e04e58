use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub mod log;

pub use self::log::{Level, LogConfig};

pub static DEFAULT_CONFIG: &[u8] = include_bytes!("../../default_config/gbridge.toml");

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub log: LogConfig,
    pub runtime: RuntimeConfig,
    pub signal: SignalConfig,
    pub async_ready: AsyncConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// 外部运行时动态库, 不设置则由宿主程序安装
    pub library: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SignalConfig {
    pub validate_emit_args: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AsyncConfig {
    pub reclaim_on_dispatch: bool,
}

impl BridgeConfig {
    /// 读取配置, 文件不存在时写入默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();

        if !path.is_file() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
        }

        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(s)?)
    }
}
