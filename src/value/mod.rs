use std::any::Any;
use std::ffi::{CStr, CString};
use std::fmt::{Debug, Formatter};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::Arc;

use gbridge_ffi::{RawValue, TypeTag};

use crate::error::{BridgeError, BridgeResult};
use crate::object::Object;
use crate::runtime::{type_name, vtable};

pub mod marshal;

pub use marshal::{
    host_to_value, host_to_value_for, lookup, register_defaults, register_marshaler,
    value_to_host, Marshaler,
};

/// 外部值容器, 丢弃时释放
pub struct Value {
    ptr: NonNull<()>,
}

macro_rules! scalar_accessors {
    ($($get:ident: $vget:ident, $set:ident: $vset:ident => $ty:ty;)*) => {
        impl Value {
            $(
            #[inline]
            pub fn $get(&self) -> $ty {
                (vtable().$vget)(self.as_ptr())
            }

            #[inline]
            pub fn $set(&mut self, v: $ty) {
                (vtable().$vset)(self.as_ptr(), v)
            }
            )*
        }
    };
}

scalar_accessors! {
    get_boolean: value_get_boolean, set_boolean: value_set_boolean => bool;
    get_char: value_get_char, set_char: value_set_char => i8;
    get_uchar: value_get_uchar, set_uchar: value_set_uchar => u8;
    get_int: value_get_int, set_int: value_set_int => i32;
    get_uint: value_get_uint, set_uint: value_set_uint => u32;
    get_long: value_get_long, set_long: value_set_long => i64;
    get_ulong: value_get_ulong, set_ulong: value_set_ulong => u64;
    get_int64: value_get_int64, set_int64: value_set_int64 => i64;
    get_uint64: value_get_uint64, set_uint64: value_set_uint64 => u64;
    get_enum: value_get_enum, set_enum: value_set_enum => i32;
    get_flags: value_get_flags, set_flags: value_set_flags => u32;
    get_float: value_get_float, set_float: value_set_float => f32;
    get_double: value_get_double, set_double: value_set_double => f64;
}

impl Value {
    pub fn new(tag: TypeTag) -> BridgeResult<Self> {
        let raw = (vtable().value_new)(tag);

        NonNull::new(raw).map(|ptr| Self { ptr }).ok_or_else(|| {
            BridgeError::ConversionFailure(format!(
                "unable to allocate value of type {}",
                type_name(tag)
            ))
        })
    }

    /// 未初始化类型的值, 由外部填充
    #[inline]
    pub fn alloc() -> BridgeResult<Self> {
        Self::new(TypeTag::INVALID)
    }

    /// # Safety
    /// `raw`须归调用者所有, 丢弃时释放
    pub unsafe fn from_raw(raw: RawValue) -> Option<Self> {
        NonNull::new(raw).map(|ptr| Self { ptr })
    }

    /// 借用外部持有的值
    ///
    /// # Safety
    /// 使用期间`raw`须保持有效
    pub unsafe fn borrow_raw(raw: RawValue) -> Option<ManuallyDrop<Self>> {
        Self::from_raw(raw).map(ManuallyDrop::new)
    }

    pub fn into_raw(self) -> RawValue {
        ManuallyDrop::new(self).as_ptr()
    }

    #[inline]
    pub fn as_ptr(&self) -> RawValue {
        self.ptr.as_ptr()
    }

    pub fn type_tag(&self) -> TypeTag {
        (vtable().value_type)(self.as_ptr())
    }

    pub fn type_name(&self) -> String {
        type_name(self.type_tag())
    }

    pub fn is_unset(&self) -> bool {
        !self.type_tag().is_valid()
    }

    pub fn copy_into(&self, dest: RawValue) {
        (vtable().value_copy)(self.as_ptr(), dest);
    }

    pub fn get_string(&self) -> Option<String> {
        let ptr = (vtable().value_get_string)(self.as_ptr());
        if ptr.is_null() {
            return None;
        }

        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    pub fn set_string(&mut self, s: &str) -> BridgeResult<()> {
        let c_str = CString::new(s).map_err(|_| {
            BridgeError::ConversionFailure(format!("string {:?} contains a nul byte", s))
        })?;
        (vtable().value_set_string)(self.as_ptr(), c_str.as_ptr());

        Ok(())
    }

    #[inline]
    pub fn get_pointer(&self) -> *mut () {
        (vtable().value_get_pointer)(self.as_ptr())
    }

    #[inline]
    pub fn set_pointer(&mut self, p: *mut ()) {
        (vtable().value_set_pointer)(self.as_ptr(), p)
    }

    pub fn get_object(&self) -> Object {
        Object::wrap((vtable().value_get_object)(self.as_ptr()))
    }

    pub fn set_object(&mut self, obj: &Object) {
        (vtable().value_set_object)(self.as_ptr(), obj.native());
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        (vtable().value_free)(self.as_ptr());
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Value({:p})", self.ptr.as_ptr())
    }
}

/// 外部值在本地的表示
#[derive(Clone)]
pub enum HostValue {
    None,
    Bool(bool),
    Char(i8),
    UChar(u8),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Int64(i64),
    UInt64(u64),
    Enum(i32),
    Flags(u32),
    Float(f32),
    Double(f64),
    String(String),
    Pointer(usize),
    Object(Object),
    /// 自定义转换器产生的值
    Other {
        tag: TypeTag,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl HostValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::None => TypeTag::NONE,
            Self::Bool(_) => TypeTag::BOOLEAN,
            Self::Char(_) => TypeTag::CHAR,
            Self::UChar(_) => TypeTag::UCHAR,
            Self::Int(_) => TypeTag::INT,
            Self::UInt(_) => TypeTag::UINT,
            Self::Long(_) => TypeTag::LONG,
            Self::ULong(_) => TypeTag::ULONG,
            Self::Int64(_) => TypeTag::INT64,
            Self::UInt64(_) => TypeTag::UINT64,
            Self::Enum(_) => TypeTag::ENUM,
            Self::Flags(_) => TypeTag::FLAGS,
            Self::Float(_) => TypeTag::FLOAT,
            Self::Double(_) => TypeTag::DOUBLE,
            Self::String(_) => TypeTag::STRING,
            Self::Pointer(_) => TypeTag::POINTER,
            Self::Object(obj) if obj.is_none() => TypeTag::OBJECT,
            Self::Object(obj) => obj.type_id(),
            Self::Other { tag, .. } => *tag,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::UChar(_) => "uchar",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Long(_) => "long",
            Self::ULong(_) => "ulong",
            Self::Int64(_) => "int64",
            Self::UInt64(_) => "uint64",
            Self::Enum(_) => "enum",
            Self::Flags(_) => "flags",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Pointer(_) => "pointer",
            Self::Object(_) => "object",
            Self::Other { .. } => "custom",
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Char(v) => Some(v.into()),
            Self::Int(v) | Self::Enum(v) => Some(v.into()),
            Self::Long(v) | Self::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v.into()),
            Self::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Other { value, .. } => value.downcast_ref(),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        use HostValue::*;

        match (self, other) {
            (None, None) => true,
            (Bool(a), Bool(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (UChar(a), UChar(b)) => a == b,
            (Int(a), Int(b)) | (Enum(a), Enum(b)) => a == b,
            (UInt(a), UInt(b)) | (Flags(a), Flags(b)) => a == b,
            (Long(a), Long(b)) | (Int64(a), Int64(b)) => a == b,
            (ULong(a), ULong(b)) | (UInt64(a), UInt64(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Double(a), Double(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Pointer(a), Pointer(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Other { tag: ta, value: a }, Other { tag: tb, value: b }) => {
                ta == tb && Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl Debug for HostValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(v) => write!(f, "Bool({})", v),
            Self::Char(v) => write!(f, "Char({})", v),
            Self::UChar(v) => write!(f, "UChar({})", v),
            Self::Int(v) => write!(f, "Int({})", v),
            Self::UInt(v) => write!(f, "UInt({})", v),
            Self::Long(v) => write!(f, "Long({})", v),
            Self::ULong(v) => write!(f, "ULong({})", v),
            Self::Int64(v) => write!(f, "Int64({})", v),
            Self::UInt64(v) => write!(f, "UInt64({})", v),
            Self::Enum(v) => write!(f, "Enum({})", v),
            Self::Flags(v) => write!(f, "Flags({:#x})", v),
            Self::Float(v) => write!(f, "Float({})", v),
            Self::Double(v) => write!(f, "Double({})", v),
            Self::String(v) => write!(f, "String({:?})", v),
            Self::Pointer(v) => write!(f, "Pointer({:#x})", v),
            Self::Object(v) => write!(f, "{:?}", v),
            Self::Other { tag, .. } => write!(f, "Other({:?})", tag),
        }
    }
}

macro_rules! host_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for HostValue {
            #[inline]
            fn from(v: $ty) -> Self {
                Self::$variant(v)
            }
        })*
    };
}

host_value_from! {
    bool => Bool,
    i8 => Char,
    u8 => UChar,
    i32 => Int,
    u32 => UInt,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Object => Object,
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<&Object> for HostValue {
    fn from(obj: &Object) -> Self {
        Self::Object(obj.clone())
    }
}

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        Self::None
    }
}
