use std::fmt::{Debug, Display, Formatter};
use std::io;

use gbridge_ffi::error::RawError;

use crate::runtime::vtable;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug)]
pub enum BridgeError {
    NotFound(String),
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },
    ConversionFailure(String),
    /// 外部运行时报告的错误
    Foreign(ForeignError),
    Load(LoadError),
}

#[derive(Debug)]
pub enum LoadError {
    IO(io::Error),
    Library(libloading::Error),
    Config(toml::de::Error),
    NullVTable,
    AlreadyInstalled,
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {}", what),
            Self::TypeMismatch {
                context,
                expected,
                actual,
            } => write!(
                f,
                "invalid type {} for {}, expected {}",
                actual, context, expected
            ),
            Self::ConversionFailure(msg) => write!(f, "conversion failed: {}", msg),
            Self::Foreign(e) => Display::fmt(e, f),
            Self::Load(e) => Display::fmt(e, f),
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IO(e) => write!(f, "io error: {}", e),
            Self::Library(e) => write!(f, "unable to load runtime library: {}", e),
            Self::Config(e) => write!(f, "invalid config: {}", e),
            Self::NullVTable => write!(f, "runtime library returned a null vtable"),
            Self::AlreadyInstalled => write!(f, "a foreign runtime is already installed"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl std::error::Error for LoadError {}

impl From<ForeignError> for BridgeError {
    fn from(err: ForeignError) -> Self {
        Self::Foreign(err)
    }
}

impl From<LoadError> for BridgeError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<libloading::Error> for LoadError {
    fn from(err: libloading::Error) -> Self {
        Self::Library(err)
    }
}

impl From<toml::de::Error> for LoadError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignError {
    pub domain: u32,
    pub code: i32,
    pub message: String,
}

impl ForeignError {
    /// 取出错误信息并释放`raw`
    ///
    /// # Safety
    /// `raw`须为空或归调用者所有且未释放
    pub unsafe fn take_raw(raw: *mut RawError) -> Option<Self> {
        if raw.is_null() {
            return None;
        }

        let guard = RawErrorGuard(raw);
        let raw = &*guard.0;

        Some(Self {
            domain: raw.domain,
            code: raw.code,
            message: raw.message_lossy(),
        })
    }
}

impl Display for ForeignError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ForeignError {}

struct RawErrorGuard(*mut RawError);

impl Drop for RawErrorGuard {
    fn drop(&mut self) {
        (vtable().error_free)(self.0);
    }
}
