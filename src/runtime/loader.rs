use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gbridge_ffi::ffi::{ForeignVTable, VTableEntry, VTABLE_ENTRY_SYMBOL};
use libloading::Library;
use tracing::{info, trace};

use crate::error::LoadError;

static RUNTIME_LIBRARY: OnceLock<Library> = OnceLock::new();

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        const EXT: &str = "dylib";
    } else if #[cfg(target_os = "windows")] {
        const EXT: &str = "dll";
    } else {
        const EXT: &str = "so";
    }
}

pub fn resolve_library_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(EXT)
    }
}

/// 从动态库加载并安装外部运行时, 动态库不会被卸载
pub fn load_runtime<P: AsRef<OsStr>>(path: P) -> Result<(), LoadError> {
    if super::is_installed() {
        return Err(LoadError::AlreadyInstalled);
    }

    let path = resolve_library_path(Path::new(path.as_ref()));
    info!("正在加载外部运行时: {}", path.display());

    let (lib, vtb) = unsafe {
        trace!("正在打开运行时动态库");
        let lib = Library::new(&path)?;
        let vtb = {
            let entry = lib.get::<VTableEntry>(VTABLE_ENTRY_SYMBOL)?;
            entry()
        };

        (lib, vtb)
    };

    if vtb.is_null() {
        return Err(LoadError::NullVTable);
    }

    if RUNTIME_LIBRARY.set(lib).is_err() {
        return Err(LoadError::AlreadyInstalled);
    }

    // Safety: the table lives inside a library that is never unloaded
    let vtb: &'static ForeignVTable = unsafe { &*vtb };
    if !super::install(vtb) {
        return Err(LoadError::AlreadyInstalled);
    }

    info!("外部运行时({})加载成功", path.display());
    Ok(())
}
