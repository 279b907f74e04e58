use std::ffi::c_char;

pub mod closure;
pub mod error;
pub mod ffi;
pub mod types;

pub use types::TypeTag;

/// 外部对象实例
pub type RawObject = *mut ();
pub type RawValue = *mut ();
/// 每个处理器对应一个闭包
pub type RawClosure = *mut ();
pub type RawAsyncResult = *mut ();

#[repr(C)]
pub struct RawParamSpec {
    pub name: *const c_char,
    pub value_type: TypeTag,
    pub owner_type: TypeTag,
    pub flags: u32,
}

impl RawParamSpec {
    pub const READABLE: u32 = 1 << 0;
    pub const WRITABLE: u32 = 1 << 1;
}

#[repr(C)]
pub struct RawSignalQuery {
    pub signal_id: u32,
    pub signal_name: *const c_char,
    pub itype: TypeTag,
    pub return_type: TypeTag,
    pub n_params: u32,
    pub param_types: *const TypeTag,
}

impl Default for RawSignalQuery {
    fn default() -> Self {
        Self {
            signal_id: 0,
            signal_name: std::ptr::null(),
            itype: TypeTag::INVALID,
            return_type: TypeTag::NONE,
            n_params: 0,
            param_types: std::ptr::null(),
        }
    }
}

impl RawSignalQuery {
    pub fn param_types(&self) -> &[TypeTag] {
        if self.param_types.is_null() || self.n_params == 0 {
            return &[];
        }

        unsafe { std::slice::from_raw_parts(self.param_types, self.n_params as usize) }
    }
}
