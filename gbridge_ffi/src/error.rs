use std::ffi::{c_char, CStr};

/// 外部错误, 须通过`ForeignVTable::error_free`释放
#[repr(C)]
pub struct RawError {
    pub domain: u32,
    pub code: i32,
    pub message: *mut c_char,
}

impl RawError {
    /// # Safety
    /// `message`须为空或有效的C字符串
    pub unsafe fn message_lossy(&self) -> String {
        if self.message.is_null() {
            return String::new();
        }

        CStr::from_ptr(self.message).to_string_lossy().into_owned()
    }
}
