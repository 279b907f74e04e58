use std::sync::OnceLock;

use gbridge_ffi::ffi::ForeignVTable;
use gbridge_ffi::TypeTag;
use tracing::{debug, warn};

mod loader;

pub use loader::{load_runtime, resolve_library_path};

static FOREIGN_VTABLE: OnceLock<&'static ForeignVTable> = OnceLock::new();

/// 安装外部运行时, 仅首次调用生效
pub fn install(vtb: &'static ForeignVTable) -> bool {
    let installed = FOREIGN_VTABLE.set(vtb).is_ok();

    if installed {
        debug!("已安装外部运行时: {:p}", vtb);
    } else {
        warn!("外部运行时已安装, 忽略本次安装");
    }

    installed
}

#[inline]
pub fn is_installed() -> bool {
    FOREIGN_VTABLE.get().is_some()
}

/// # Panics
/// 尚未安装运行时
#[inline]
pub fn vtable() -> &'static ForeignVTable {
    match FOREIGN_VTABLE.get() {
        Some(vtb) => vtb,
        None => panic!("foreign runtime not installed, call gbridge::runtime::install first"),
    }
}

pub fn type_name(tag: TypeTag) -> String {
    if let Some(name) = tag.fundamental_name() {
        return name.to_owned();
    }

    if !is_installed() {
        return format!("{:#x}", tag.0);
    }

    let ptr = (vtable().type_name)(tag);
    if ptr.is_null() {
        return format!("{:#x}", tag.0);
    }

    unsafe { std::ffi::CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

pub fn type_fundamental(tag: TypeTag) -> TypeTag {
    if tag.is_fundamental() {
        tag
    } else {
        (vtable().type_fundamental)(tag)
    }
}

pub fn type_is_a(tag: TypeTag, ancestor: TypeTag) -> bool {
    tag == ancestor || (vtable().type_is_a)(tag, ancestor)
}
