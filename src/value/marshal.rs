use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use gbridge_ffi::TypeTag;
use tracing::debug;

use super::{HostValue, Value};
use crate::error::{BridgeError, BridgeResult};
use crate::runtime::{self, type_name};

pub type ToHost = fn(&Value) -> BridgeResult<HostValue>;
/// 参数为目标类型, 即注册的类型或其派生类型
pub type ToForeign = fn(&HostValue, TypeTag) -> BridgeResult<Value>;

#[derive(Copy, Clone)]
pub struct Marshaler {
    pub to_host: ToHost,
    pub to_foreign: ToForeign,
}

type MarshalerTable = HashMap<TypeTag, Marshaler>;

static MARSHALERS: OnceLock<RwLock<MarshalerTable>> = OnceLock::new();

fn marshalers() -> &'static RwLock<MarshalerTable> {
    MARSHALERS.get_or_init(|| RwLock::new(default_marshalers().into_iter().collect()))
}

pub fn register_marshaler(tag: TypeTag, to_host: ToHost, to_foreign: ToForeign) {
    let mut table = marshalers().write().unwrap_or_else(PoisonError::into_inner);
    if table.insert(tag, Marshaler { to_host, to_foreign }).is_some() {
        debug!("已覆盖类型({:?})的转换器", tag);
    }
}

/// 补充缺失的基本类型转换器, 不覆盖已注册的
pub fn register_defaults() {
    let mut table = marshalers().write().unwrap_or_else(PoisonError::into_inner);
    for (tag, marshaler) in default_marshalers() {
        table.entry(tag).or_insert(marshaler);
    }
}

/// 查找转换器, 找不到时使用其基本类型的转换器
pub fn lookup(tag: TypeTag) -> BridgeResult<Marshaler> {
    let table = marshalers().read().unwrap_or_else(PoisonError::into_inner);

    if let Some(m) = table.get(&tag) {
        return Ok(*m);
    }

    if !tag.is_fundamental() && runtime::is_installed() {
        let fundamental = runtime::type_fundamental(tag);
        if let Some(m) = table.get(&fundamental) {
            return Ok(*m);
        }
    }

    Err(BridgeError::NotFound(format!(
        "no marshaler registered for type {}",
        type_name(tag)
    )))
}

pub fn value_to_host(value: &Value) -> BridgeResult<HostValue> {
    let marshaler = lookup(value.type_tag())?;
    (marshaler.to_host)(value)
}

pub fn host_to_value(value: &HostValue) -> BridgeResult<Value> {
    let tag = value.type_tag();
    let marshaler = lookup(tag)?;
    (marshaler.to_foreign)(value, tag)
}

/// 在可表示时转换为`target`类型的值, 否则按自身类型转换, 由调用者处理类型不符
pub fn host_to_value_for(value: &HostValue, target: TypeTag) -> BridgeResult<Value> {
    if !fits(value, target) {
        return host_to_value(value);
    }

    let marshaler = lookup(target)?;
    (marshaler.to_foreign)(value, target)
}

fn fits(value: &HostValue, target: TypeTag) -> bool {
    if value.type_tag() == target {
        return true;
    }

    if !target.is_valid() || !runtime::is_installed() {
        return false;
    }

    let fundamental = runtime::type_fundamental(target);
    match value {
        HostValue::None => matches!(
            fundamental,
            TypeTag::NONE | TypeTag::STRING | TypeTag::OBJECT
        ),
        HostValue::Enum(_) => fundamental == TypeTag::ENUM,
        HostValue::Flags(_) => fundamental == TypeTag::FLAGS,
        HostValue::Object(obj) => {
            fundamental == TypeTag::OBJECT && (obj.is_none() || obj.is_a(target))
        }
        _ => false,
    }
}

fn unexpected(tag: TypeTag, got: &HostValue) -> BridgeError {
    BridgeError::ConversionFailure(format!(
        "cannot convert {} into {}",
        got.kind(),
        type_name(tag)
    ))
}

macro_rules! scalar_marshalers {
    ($($tag:ident => $variant:ident, $get:ident, $set:ident;)*) => {
        vec![$(
            (
                TypeTag::$tag,
                Marshaler {
                    to_host: |v: &Value| Ok(HostValue::$variant(v.$get())),
                    to_foreign: |x: &HostValue, target: TypeTag| match x {
                        HostValue::$variant(inner) => {
                            let mut v = Value::new(target)?;
                            v.$set(*inner);
                            Ok(v)
                        }
                        other => Err(unexpected(target, other)),
                    },
                },
            ),
        )*]
    };
}

fn default_marshalers() -> Vec<(TypeTag, Marshaler)> {
    let mut table = scalar_marshalers! {
        BOOLEAN => Bool, get_boolean, set_boolean;
        CHAR => Char, get_char, set_char;
        UCHAR => UChar, get_uchar, set_uchar;
        INT => Int, get_int, set_int;
        UINT => UInt, get_uint, set_uint;
        LONG => Long, get_long, set_long;
        ULONG => ULong, get_ulong, set_ulong;
        INT64 => Int64, get_int64, set_int64;
        UINT64 => UInt64, get_uint64, set_uint64;
        ENUM => Enum, get_enum, set_enum;
        FLAGS => Flags, get_flags, set_flags;
        FLOAT => Float, get_float, set_float;
        DOUBLE => Double, get_double, set_double;
    };

    table.push((
        TypeTag::NONE,
        Marshaler {
            to_host: |_: &Value| Ok(HostValue::None),
            to_foreign: |x: &HostValue, target: TypeTag| match x {
                HostValue::None => Value::new(target),
                other => Err(unexpected(target, other)),
            },
        },
    ));

    table.push((
        TypeTag::STRING,
        Marshaler {
            to_host: |v: &Value| Ok(v.get_string().map_or(HostValue::None, HostValue::String)),
            to_foreign: |x: &HostValue, target: TypeTag| match x {
                HostValue::String(s) => {
                    let mut v = Value::new(target)?;
                    v.set_string(s)?;
                    Ok(v)
                }
                // null string
                HostValue::None => Value::new(target),
                other => Err(unexpected(target, other)),
            },
        },
    ));

    table.push((
        TypeTag::POINTER,
        Marshaler {
            to_host: |v: &Value| Ok(HostValue::Pointer(v.get_pointer() as usize)),
            to_foreign: |x: &HostValue, target: TypeTag| match x {
                HostValue::Pointer(p) => {
                    let mut v = Value::new(target)?;
                    v.set_pointer(*p as *mut ());
                    Ok(v)
                }
                other => Err(unexpected(target, other)),
            },
        },
    ));

    table.push((
        TypeTag::OBJECT,
        Marshaler {
            to_host: |v: &Value| Ok(HostValue::Object(v.get_object())),
            to_foreign: |x: &HostValue, target: TypeTag| match x {
                HostValue::None => Value::new(target),
                HostValue::Object(obj) if obj.is_none() || obj.is_a(target) => {
                    let mut v = Value::new(target)?;
                    v.set_object(obj);
                    Ok(v)
                }
                HostValue::Object(obj) => Err(BridgeError::TypeMismatch {
                    context: "object value".into(),
                    expected: type_name(target),
                    actual: obj.type_name(),
                }),
                other => Err(unexpected(target, other)),
            },
        },
    ));

    table
}
