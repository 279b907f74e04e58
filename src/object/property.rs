use std::ffi::CString;

use gbridge_ffi::TypeTag;
use tracing::trace;

use super::Object;
use crate::error::{BridgeError, BridgeResult};
use crate::runtime::{type_name, vtable};
use crate::value::{marshal, HostValue, Value};

pub(crate) fn c_name(kind: &str, name: &str) -> BridgeResult<CString> {
    CString::new(name).map_err(|_| {
        BridgeError::ConversionFailure(format!("{} name {:?} contains a nul byte", kind, name))
    })
}

impl Object {
    pub fn property_type(&self, name: &str) -> BridgeResult<TypeTag> {
        let Some(handle) = self.native_nonnull() else {
            return Err(BridgeError::NotFound(format!(
                "property {} on a none object",
                name
            )));
        };

        let c_name = c_name("property", name)?;
        let spec = (vtable().object_find_property)(handle, c_name.as_ptr());
        if spec.is_null() {
            return Err(BridgeError::NotFound(format!(
                "property {} on {}",
                name,
                self.type_name()
            )));
        }

        Ok(unsafe { (*spec).value_type })
    }

    pub fn property(&self, name: &str) -> BridgeResult<HostValue> {
        let tag = self.property_type(name)?;
        let value = Value::new(tag)?;
        let c_name = c_name("property", name)?;

        (vtable().object_get_property)(self.native(), c_name.as_ptr(), value.as_ptr());
        trace!(property = name, "read property");

        marshal::value_to_host(&value)
    }

    /// 按属性声明的类型转换并写入
    ///
    /// 转换后类型与声明不完全一致时不写入
    pub fn set_property<V: Into<HostValue>>(&self, name: &str, value: V) -> BridgeResult<()> {
        let expected = self.property_type(name)?;
        let value = marshal::host_to_value_for(&value.into(), expected)?;

        self.write_property(name, expected, &value)
    }

    #[inline]
    pub fn set<V: Into<HostValue>>(&self, name: &str, value: V) -> BridgeResult<()> {
        self.set_property(name, value)
    }

    pub fn set_property_value(&self, name: &str, value: &Value) -> BridgeResult<()> {
        let expected = self.property_type(name)?;

        self.write_property(name, expected, value)
    }

    fn write_property(&self, name: &str, expected: TypeTag, value: &Value) -> BridgeResult<()> {
        let actual = value.type_tag();
        if actual != expected {
            return Err(BridgeError::TypeMismatch {
                context: format!("property {}", name),
                expected: type_name(expected),
                actual: type_name(actual),
            });
        }

        let c_name = c_name("property", name)?;
        (vtable().object_set_property)(self.native(), c_name.as_ptr(), value.as_ptr());
        trace!(property = name, "wrote property");

        Ok(())
    }
}
