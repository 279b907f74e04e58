//! 进程内模拟的外部运行时
//!
//! 对象从不释放, 最后一次unref后仍可检查引用计数

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, Once, OnceLock, PoisonError};

use dashmap::DashMap;
use gbridge::TypeTag;
use gbridge_ffi::closure::ClosureMarshal;
use gbridge_ffi::error::RawError;
use gbridge_ffi::ffi::ForeignVTable;
use gbridge_ffi::{
    RawAsyncResult, RawClosure, RawObject, RawParamSpec, RawSignalQuery, RawValue,
};

pub const MOCK_OBJECT: TypeTag = TypeTag(0x1000);
pub const MOCK_WIDGET: TypeTag = TypeTag(0x1100);
pub const MOCK_ASYNC_RESULT: TypeTag = TypeTag(0x1200);
pub const MOCK_MODE: TypeTag = TypeTag(0x1300);

pub const CHANGED: u32 = 1;
pub const RENAMED: u32 = 2;
pub const POKE: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Ref,
    Unref,
    RefSink,
    ForceFloating,
    GetProperty(String),
    SetProperty(String),
    Emit(u32),
    StopEmission(String),
    Connect(String),
    Block(u64),
    Unblock(u64),
    Disconnect(u64),
    ClosureInvalidate,
    ClosureUnref,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MockData {
    Empty,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(Option<CString>),
    Pointer(usize),
    Object(usize),
}

impl MockData {
    pub fn string(s: &str) -> Self {
        MockData::Str(CString::new(s).ok())
    }
}

struct MockValue {
    tag: TypeTag,
    data: MockData,
}

struct MockObject {
    tag: TypeTag,
    refcount: i32,
    floating: bool,
    properties: HashMap<String, MockData>,
}

struct MockClosure {
    marshal: ClosureMarshal,
    refcount: i32,
    invalidated: bool,
}

#[derive(Clone)]
struct MockHandler {
    instance: usize,
    signal_id: u32,
    closure: usize,
    after: bool,
    blocked: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Emission {
    pub signal_id: u32,
    pub n_values: u32,
    pub arg_tags: Vec<TypeTag>,
    pub accepted: bool,
}

struct MockAsync {
    user_data: usize,
    source: usize,
    tag: usize,
    legacy_error: Option<(u32, i32, String)>,
    errors_issued: usize,
    errors_freed: usize,
}

struct MockState {
    next_handle: AtomicUsize,
    next_handler: AtomicU64,
    objects: DashMap<usize, MockObject>,
    calls: DashMap<usize, Vec<Call>>,
    params: HashMap<(TypeTag, &'static str), usize>,
    closures: DashMap<usize, MockClosure>,
    handlers: DashMap<u64, MockHandler>,
    emissions: DashMap<usize, Emission>,
    stops: DashMap<usize, String>,
    results: DashMap<usize, MockAsync>,
    errors: DashMap<usize, usize>,
    bad_frees: AtomicUsize,
}

const PROPERTIES: &[(TypeTag, &str, TypeTag)] = &[
    (MOCK_OBJECT, "count", TypeTag::INT),
    (MOCK_OBJECT, "label", TypeTag::STRING),
    (MOCK_OBJECT, "ratio", TypeTag::DOUBLE),
    (MOCK_OBJECT, "enabled", TypeTag::BOOLEAN),
    (MOCK_OBJECT, "peer", MOCK_OBJECT),
    (MOCK_OBJECT, "blob", TypeTag::VARIANT),
    (MOCK_OBJECT, "mode", MOCK_MODE),
    (MOCK_WIDGET, "width", TypeTag::UINT),
];

struct SignalDef {
    id: u32,
    name: &'static str,
    itype: TypeTag,
    return_type: TypeTag,
    params: &'static [TypeTag],
}

static CHANGED_PARAMS: [TypeTag; 1] = [TypeTag::INT];
static RENAMED_PARAMS: [TypeTag; 1] = [TypeTag::STRING];

static SIGNALS: [SignalDef; 3] = [
    SignalDef {
        id: CHANGED,
        name: "changed",
        itype: MOCK_OBJECT,
        return_type: TypeTag::INT,
        params: &CHANGED_PARAMS,
    },
    SignalDef {
        id: RENAMED,
        name: "renamed",
        itype: MOCK_OBJECT,
        return_type: TypeTag::NONE,
        params: &RENAMED_PARAMS,
    },
    SignalDef {
        id: POKE,
        name: "poke",
        itype: MOCK_OBJECT,
        return_type: TypeTag::NONE,
        params: &[],
    },
];

fn state() -> &'static MockState {
    static STATE: OnceLock<MockState> = OnceLock::new();
    STATE.get_or_init(|| {
        let mut params = HashMap::new();
        for (owner, name, value_type) in PROPERTIES {
            let c_name = CString::new(*name).unwrap_or_default();
            let spec = Box::leak(Box::new(RawParamSpec {
                name: c_name.into_raw(),
                value_type: *value_type,
                owner_type: *owner,
                flags: RawParamSpec::READABLE | RawParamSpec::WRITABLE,
            }));
            params.insert((*owner, *name), spec as *const RawParamSpec as usize);
        }

        MockState {
            next_handle: AtomicUsize::new(0x10_0000),
            next_handler: AtomicU64::new(1),
            objects: DashMap::new(),
            calls: DashMap::new(),
            params,
            closures: DashMap::new(),
            handlers: DashMap::new(),
            emissions: DashMap::new(),
            stops: DashMap::new(),
            results: DashMap::new(),
            errors: DashMap::new(),
            bad_frees: AtomicUsize::new(0),
        }
    })
}

fn next_handle() -> usize {
    state().next_handle.fetch_add(0x10, Ordering::Relaxed)
}

fn record(handle: usize, call: Call) {
    state().calls.entry(handle).or_default().push(call);
}

fn parent(tag: TypeTag) -> Option<TypeTag> {
    match tag {
        MOCK_OBJECT => Some(TypeTag::OBJECT),
        MOCK_WIDGET => Some(MOCK_OBJECT),
        MOCK_ASYNC_RESULT => Some(TypeTag::OBJECT),
        MOCK_MODE => Some(TypeTag::ENUM),
        _ => None,
    }
}

fn is_a(tag: TypeTag, ancestor: TypeTag) -> bool {
    let mut current = Some(tag);
    while let Some(t) = current {
        if t == ancestor {
            return true;
        }
        current = parent(t);
    }

    false
}

fn fundamental_of(tag: TypeTag) -> TypeTag {
    if tag.is_fundamental() {
        return tag;
    }

    match parent(tag) {
        Some(p) => fundamental_of(p),
        None => TypeTag::INVALID,
    }
}

fn default_data(tag: TypeTag) -> MockData {
    match fundamental_of(tag) {
        TypeTag::BOOLEAN => MockData::Bool(false),
        TypeTag::CHAR | TypeTag::INT | TypeTag::LONG | TypeTag::INT64 | TypeTag::ENUM => {
            MockData::Int(0)
        }
        TypeTag::UCHAR | TypeTag::UINT | TypeTag::ULONG | TypeTag::UINT64 | TypeTag::FLAGS => {
            MockData::UInt(0)
        }
        TypeTag::FLOAT | TypeTag::DOUBLE => MockData::Float(0.0),
        TypeTag::STRING => MockData::Str(None),
        TypeTag::POINTER => MockData::Pointer(0),
        TypeTag::OBJECT => MockData::Object(0),
        _ => MockData::Empty,
    }
}

fn retain(data: &MockData) {
    if let MockData::Object(h) = data {
        if *h != 0 {
            object_ref(*h as RawObject);
        }
    }
}

fn release(data: MockData) {
    if let MockData::Object(h) = data {
        if h != 0 {
            object_unref(h as RawObject);
        }
    }
}

unsafe fn mock_value<'a>(v: RawValue) -> Option<&'a mut MockValue> {
    (v as *mut MockValue).as_mut()
}

fn value_data(v: RawValue) -> MockData {
    unsafe { mock_value(v) }.map_or(MockData::Empty, |v| v.data.clone())
}

fn store(v: RawValue, data: MockData) {
    if let Some(value) = unsafe { mock_value(v) } {
        let old = std::mem::replace(&mut value.data, data);
        release(old);
    }
}

// type system

extern "C" fn type_is_a(tag: TypeTag, ancestor: TypeTag) -> bool {
    is_a(tag, ancestor)
}

extern "C" fn type_fundamental(tag: TypeTag) -> TypeTag {
    fundamental_of(tag)
}

extern "C" fn type_name(tag: TypeTag) -> *const c_char {
    let name: &'static [u8] = match tag {
        MOCK_OBJECT => b"MockObject\0",
        MOCK_WIDGET => b"MockWidget\0",
        MOCK_ASYNC_RESULT => b"MockAsyncResult\0",
        MOCK_MODE => b"MockMode\0",
        _ => return ptr::null(),
    };

    name.as_ptr() as *const c_char
}

extern "C" fn type_from_instance(h: RawObject) -> TypeTag {
    state()
        .objects
        .get(&(h as usize))
        .map_or(TypeTag::INVALID, |o| o.tag)
}

// object lifecycle

extern "C" fn object_ref(h: RawObject) -> RawObject {
    record(h as usize, Call::Ref);
    if let Some(mut o) = state().objects.get_mut(&(h as usize)) {
        o.refcount += 1;
    }

    h
}

extern "C" fn object_unref(h: RawObject) {
    record(h as usize, Call::Unref);

    let released = match state().objects.get_mut(&(h as usize)) {
        Some(mut o) => {
            o.refcount -= 1;
            if o.refcount == 0 {
                std::mem::take(&mut o.properties)
            } else {
                HashMap::new()
            }
        }
        None => HashMap::new(),
    };

    for (_, data) in released {
        release(data);
    }
}

extern "C" fn object_ref_sink(h: RawObject) -> RawObject {
    record(h as usize, Call::RefSink);
    if let Some(mut o) = state().objects.get_mut(&(h as usize)) {
        if o.floating {
            o.floating = false;
        } else {
            o.refcount += 1;
        }
    }

    h
}

extern "C" fn object_is_floating(h: RawObject) -> bool {
    state()
        .objects
        .get(&(h as usize))
        .map_or(false, |o| o.floating)
}

extern "C" fn object_force_floating(h: RawObject) {
    record(h as usize, Call::ForceFloating);
    if let Some(mut o) = state().objects.get_mut(&(h as usize)) {
        o.floating = true;
    }
}

// properties

extern "C" fn object_find_property(h: RawObject, name: *const c_char) -> *const RawParamSpec {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
    let mut current = Some(type_from_instance(h));

    while let Some(tag) = current {
        let spec = state()
            .params
            .iter()
            .find(|((owner, n), _)| *owner == tag && *n == name);
        if let Some((_, spec)) = spec {
            return *spec as *const RawParamSpec;
        }
        current = parent(tag);
    }

    ptr::null()
}

extern "C" fn object_get_property(h: RawObject, name: *const c_char, v: RawValue) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    record(h as usize, Call::GetProperty(name.clone()));

    let data = state()
        .objects
        .get(&(h as usize))
        .and_then(|o| o.properties.get(&name).cloned());

    if let Some(data) = data {
        retain(&data);
        store(v, data);
    }
}

extern "C" fn object_set_property(h: RawObject, name: *const c_char, v: RawValue) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    record(h as usize, Call::SetProperty(name.clone()));

    let data = value_data(v);
    retain(&data);

    let old = state()
        .objects
        .get_mut(&(h as usize))
        .and_then(|mut o| o.properties.insert(name, data));

    if let Some(old) = old {
        release(old);
    }
}

// values

extern "C" fn value_new(tag: TypeTag) -> RawValue {
    Box::into_raw(Box::new(MockValue {
        tag,
        data: default_data(tag),
    })) as RawValue
}

extern "C" fn value_free(v: RawValue) {
    if v.is_null() {
        return;
    }

    let value = unsafe { Box::from_raw(v as *mut MockValue) };
    release(value.data);
}

extern "C" fn value_type(v: RawValue) -> TypeTag {
    unsafe { mock_value(v) }.map_or(TypeTag::INVALID, |v| v.tag)
}

extern "C" fn value_copy(src: RawValue, dest: RawValue) {
    let Some(src) = (unsafe { mock_value(src) }) else {
        return;
    };
    let (tag, data) = (src.tag, src.data.clone());
    retain(&data);

    if let Some(dest_value) = unsafe { mock_value(dest) } {
        dest_value.tag = tag;
    }
    store(dest, data);
}

macro_rules! mock_scalars {
    ($($get:ident, $set:ident: $ty:ty => $variant:ident as $inner:ty;)*) => {
        $(
        extern "C" fn $get(v: RawValue) -> $ty {
            match value_data(v) {
                MockData::$variant(x) => x as $ty,
                _ => Default::default(),
            }
        }

        extern "C" fn $set(v: RawValue, x: $ty) {
            store(v, MockData::$variant(x as $inner));
        }
        )*
    };
}

mock_scalars! {
    value_get_char, value_set_char: i8 => Int as i64;
    value_get_uchar, value_set_uchar: u8 => UInt as u64;
    value_get_int, value_set_int: i32 => Int as i64;
    value_get_uint, value_set_uint: u32 => UInt as u64;
    value_get_long, value_set_long: i64 => Int as i64;
    value_get_ulong, value_set_ulong: u64 => UInt as u64;
    value_get_int64, value_set_int64: i64 => Int as i64;
    value_get_uint64, value_set_uint64: u64 => UInt as u64;
    value_get_enum, value_set_enum: i32 => Int as i64;
    value_get_flags, value_set_flags: u32 => UInt as u64;
    value_get_float, value_set_float: f32 => Float as f64;
    value_get_double, value_set_double: f64 => Float as f64;
}

extern "C" fn value_get_boolean(v: RawValue) -> bool {
    matches!(value_data(v), MockData::Bool(true))
}

extern "C" fn value_set_boolean(v: RawValue, x: bool) {
    store(v, MockData::Bool(x));
}

extern "C" fn value_get_string(v: RawValue) -> *const c_char {
    match unsafe { mock_value(v) } {
        Some(MockValue {
            data: MockData::Str(Some(s)),
            ..
        }) => s.as_ptr(),
        _ => ptr::null(),
    }
}

extern "C" fn value_set_string(v: RawValue, s: *const c_char) {
    let s = (!s.is_null()).then(|| unsafe { CStr::from_ptr(s) }.to_owned());
    store(v, MockData::Str(s));
}

extern "C" fn value_get_pointer(v: RawValue) -> *mut () {
    match value_data(v) {
        MockData::Pointer(p) => p as *mut (),
        _ => ptr::null_mut(),
    }
}

extern "C" fn value_set_pointer(v: RawValue, p: *mut ()) {
    store(v, MockData::Pointer(p as usize));
}

extern "C" fn value_get_object(v: RawValue) -> RawObject {
    match value_data(v) {
        MockData::Object(h) => h as RawObject,
        _ => ptr::null_mut(),
    }
}

extern "C" fn value_set_object(v: RawValue, h: RawObject) {
    let data = MockData::Object(h as usize);
    retain(&data);
    store(v, data);
}

// signals

fn signal_def(id: u32) -> Option<&'static SignalDef> {
    SIGNALS.iter().find(|s| s.id == id)
}

extern "C" fn signal_lookup(name: *const c_char, itype: TypeTag) -> u32 {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();

    SIGNALS
        .iter()
        .find(|s| s.name == name && is_a(itype, s.itype))
        .map_or(0, |s| s.id)
}

extern "C" fn signal_query(id: u32, out: *mut RawSignalQuery) {
    let Some(out) = (unsafe { out.as_mut() }) else {
        return;
    };

    *out = match signal_def(id) {
        Some(def) => RawSignalQuery {
            signal_id: def.id,
            signal_name: ptr::null(),
            itype: def.itype,
            return_type: def.return_type,
            n_params: def.params.len() as u32,
            param_types: def.params.as_ptr(),
        },
        None => RawSignalQuery::default(),
    };
}

fn invoke(closure: usize, ret: RawValue, values: &[RawValue]) {
    let marshal = match state().closures.get(&closure) {
        Some(c) if !c.invalidated => c.marshal,
        _ => return,
    };

    marshal(
        closure as RawClosure,
        ret,
        values.len() as u32,
        values.as_ptr(),
    );
}

fn stopped(instance: usize) -> bool {
    state().stops.remove(&instance).is_some()
}

extern "C" fn signal_emitv(
    values: *const RawValue,
    n_values: u32,
    signal_id: u32,
    _detail: u32,
    ret: RawValue,
) {
    let values = if values.is_null() {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(values, n_values as usize) }
    };

    let instance = match values.first().map(|v| value_data(*v)) {
        Some(MockData::Object(h)) => h,
        _ => 0,
    };
    record(instance, Call::Emit(signal_id));

    let arg_tags: Vec<TypeTag> = values.iter().map(|v| value_type(*v)).collect();
    let def = signal_def(signal_id);
    let accepted = def.map_or(false, |def| {
        def.params.len() + 1 == values.len()
            && def
                .params
                .iter()
                .zip(&arg_tags[1..])
                .all(|(expected, actual)| is_a(*actual, *expected))
    });

    state().emissions.insert(
        instance,
        Emission {
            signal_id,
            n_values,
            arg_tags,
            accepted,
        },
    );

    let Some(def) = def.filter(|_| accepted) else {
        return;
    };

    let ret = if def.return_type != TypeTag::NONE && !ret.is_null() {
        if value_type(ret) == TypeTag::INVALID {
            if let Some(slot) = unsafe { mock_value(ret) } {
                slot.tag = def.return_type;
                slot.data = default_data(def.return_type);
            }
        }
        ret
    } else {
        ptr::null_mut()
    };

    let mut handlers: Vec<(u64, MockHandler)> = state()
        .handlers
        .iter()
        .filter(|h| h.instance == instance && h.signal_id == signal_id && h.blocked == 0)
        .map(|h| (*h.key(), h.value().clone()))
        .collect();
    handlers.sort_by_key(|(id, _)| *id);

    state().stops.remove(&instance);

    for (_, handler) in handlers.iter().filter(|(_, h)| !h.after) {
        invoke(handler.closure, ret, values);
        if stopped(instance) {
            return;
        }
    }

    if signal_id == CHANGED && !ret.is_null() {
        if let MockData::Int(x) = value_data(values[1]) {
            store(ret, MockData::Int(x * 2));
        }
    }

    for (_, handler) in handlers.iter().filter(|(_, h)| h.after) {
        invoke(handler.closure, ret, values);
        if stopped(instance) {
            return;
        }
    }
}

extern "C" fn signal_stop_emission_by_name(h: RawObject, name: *const c_char) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    record(h as usize, Call::StopEmission(name.clone()));
    state().stops.insert(h as usize, name);
}

extern "C" fn signal_connect_closure(
    h: RawObject,
    name: *const c_char,
    closure: RawClosure,
    after: bool,
) -> u64 {
    let signal = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    record(h as usize, Call::Connect(signal));

    let signal_id = signal_lookup(name, type_from_instance(h));
    if signal_id == 0 {
        return 0;
    }

    if let Some(mut c) = state().closures.get_mut(&(closure as usize)) {
        c.refcount += 1;
    }

    let id = state().next_handler.fetch_add(1, Ordering::Relaxed);
    state().handlers.insert(
        id,
        MockHandler {
            instance: h as usize,
            signal_id,
            closure: closure as usize,
            after,
            blocked: 0,
        },
    );

    id
}

extern "C" fn signal_handler_block(h: RawObject, id: u64) {
    record(h as usize, Call::Block(id));
    if let Some(mut handler) = state().handlers.get_mut(&id) {
        handler.blocked += 1;
    }
}

extern "C" fn signal_handler_unblock(h: RawObject, id: u64) {
    record(h as usize, Call::Unblock(id));
    if let Some(mut handler) = state().handlers.get_mut(&id) {
        handler.blocked = handler.blocked.saturating_sub(1);
    }
}

extern "C" fn signal_handler_disconnect(h: RawObject, id: u64) {
    record(h as usize, Call::Disconnect(id));

    let Some((_, handler)) = state().handlers.remove(&id) else {
        return;
    };

    if let Some(mut c) = state().closures.get_mut(&handler.closure) {
        c.refcount -= 1;
    }
}

extern "C" fn closure_new(marshal: ClosureMarshal) -> RawClosure {
    let handle = next_handle();
    state().closures.insert(
        handle,
        MockClosure {
            marshal,
            refcount: 1,
            invalidated: false,
        },
    );

    handle as RawClosure
}

extern "C" fn closure_invalidate(c: RawClosure) {
    record(c as usize, Call::ClosureInvalidate);
    if let Some(mut closure) = state().closures.get_mut(&(c as usize)) {
        closure.invalidated = true;
    }
}

extern "C" fn closure_unref(c: RawClosure) {
    record(c as usize, Call::ClosureUnref);
    if let Some(mut closure) = state().closures.get_mut(&(c as usize)) {
        closure.refcount -= 1;
    }
}

// async results

extern "C" fn async_result_get_user_data(r: RawAsyncResult) -> *mut () {
    state()
        .results
        .get(&(r as usize))
        .map_or(ptr::null_mut(), |a| a.user_data as *mut ())
}

extern "C" fn async_result_get_source_object(r: RawAsyncResult) -> RawObject {
    let source = state().results.get(&(r as usize)).map_or(0, |a| a.source);
    if source == 0 {
        return ptr::null_mut();
    }

    object_ref(source as RawObject)
}

extern "C" fn async_result_is_tagged(r: RawAsyncResult, tag: *const ()) -> bool {
    state()
        .results
        .get(&(r as usize))
        .map_or(false, |a| a.tag != 0 && a.tag == tag as usize)
}

extern "C" fn async_result_legacy_propagate_error(
    r: RawAsyncResult,
    out: *mut *mut RawError,
) -> bool {
    let legacy = state()
        .results
        .get(&(r as usize))
        .and_then(|a| a.legacy_error.clone());

    let Some((domain, code, message)) = legacy else {
        return false;
    };

    let message = CString::new(message).unwrap_or_default().into_raw();
    let err = Box::into_raw(Box::new(RawError {
        domain,
        code,
        message,
    }));

    state().errors.insert(err as usize, r as usize);
    if let Some(mut a) = state().results.get_mut(&(r as usize)) {
        a.errors_issued += 1;
    }

    if let Some(out) = unsafe { out.as_mut() } {
        *out = err;
    }

    true
}

extern "C" fn error_free(err: *mut RawError) {
    if err.is_null() {
        return;
    }

    let Some((_, owner)) = state().errors.remove(&(err as usize)) else {
        state().bad_frees.fetch_add(1, Ordering::Relaxed);
        return;
    };

    let err = unsafe { Box::from_raw(err) };
    if !err.message.is_null() {
        drop(unsafe { CString::from_raw(err.message) });
    }

    if let Some(mut a) = state().results.get_mut(&owner) {
        a.errors_freed += 1;
    }
}

pub static VTABLE: ForeignVTable = ForeignVTable {
    type_is_a,
    type_fundamental,
    type_name,
    type_from_instance,
    object_ref,
    object_unref,
    object_ref_sink,
    object_is_floating,
    object_force_floating,
    object_find_property,
    object_get_property,
    object_set_property,
    value_new,
    value_free,
    value_type,
    value_copy,
    value_get_boolean,
    value_set_boolean,
    value_get_char,
    value_set_char,
    value_get_uchar,
    value_set_uchar,
    value_get_int,
    value_set_int,
    value_get_uint,
    value_set_uint,
    value_get_long,
    value_set_long,
    value_get_ulong,
    value_set_ulong,
    value_get_int64,
    value_set_int64,
    value_get_uint64,
    value_set_uint64,
    value_get_enum,
    value_set_enum,
    value_get_flags,
    value_set_flags,
    value_get_float,
    value_set_float,
    value_get_double,
    value_set_double,
    value_get_string,
    value_set_string,
    value_get_pointer,
    value_set_pointer,
    value_get_object,
    value_set_object,
    signal_lookup,
    signal_query,
    signal_emitv,
    signal_stop_emission_by_name,
    signal_connect_closure,
    signal_handler_block,
    signal_handler_unblock,
    signal_handler_disconnect,
    closure_new,
    closure_invalidate,
    closure_unref,
    async_result_get_user_data,
    async_result_get_source_object,
    async_result_is_tagged,
    async_result_legacy_propagate_error,
    error_free,
};

pub fn install() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        gbridge::runtime::install(&VTABLE);
        gbridge::value::register_defaults();
    });
}

/// 串行化检查全局计数的测试
pub fn serial() -> MutexGuard<'static, ()> {
    static SERIAL: Mutex<()> = Mutex::new(());
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn new_object(tag: TypeTag, floating: bool) -> RawObject {
    let handle = next_handle();

    let properties = PROPERTIES
        .iter()
        .filter(|(owner, _, _)| is_a(tag, *owner))
        .map(|(_, name, value_type)| {
            let data = match *name {
                "label" => MockData::string("hello"),
                "ratio" => MockData::Float(0.5),
                "enabled" => MockData::Bool(true),
                _ => default_data(*value_type),
            };
            (name.to_string(), data)
        })
        .collect();

    state().objects.insert(
        handle,
        MockObject {
            tag,
            refcount: 1,
            floating,
            properties,
        },
    );

    handle as RawObject
}

pub fn release_object(h: RawObject) {
    object_unref(h);
}

pub fn refcount(h: RawObject) -> i32 {
    state().objects.get(&(h as usize)).map_or(0, |o| o.refcount)
}

pub fn floating(h: RawObject) -> bool {
    object_is_floating(h)
}

pub fn calls(h: *mut ()) -> Vec<Call> {
    state()
        .calls
        .get(&(h as usize))
        .map(|c| c.clone())
        .unwrap_or_default()
}

pub fn count_calls(h: *mut (), call: &Call) -> usize {
    calls(h).iter().filter(|c| *c == call).count()
}

pub fn property_data(h: RawObject, name: &str) -> MockData {
    state()
        .objects
        .get(&(h as usize))
        .and_then(|o| o.properties.get(name).cloned())
        .unwrap_or(MockData::Empty)
}

/// 直接写入属性, 对象会增加引用
pub fn put_property(h: RawObject, name: &str, data: MockData) {
    retain(&data);
    let old = state()
        .objects
        .get_mut(&(h as usize))
        .and_then(|mut o| o.properties.insert(name.to_owned(), data));

    if let Some(old) = old {
        release(old);
    }
}

pub fn last_emission(h: RawObject) -> Option<Emission> {
    state().emissions.get(&(h as usize)).map(|e| e.clone())
}

pub fn handler_closure(id: u64) -> Option<RawClosure> {
    state()
        .handlers
        .get(&id)
        .map(|h| h.closure as RawClosure)
}

pub fn handler_blocked(id: u64) -> Option<u32> {
    state().handlers.get(&id).map(|h| h.blocked)
}

pub fn closure_refcount(c: RawClosure) -> i32 {
    state().closures.get(&(c as usize)).map_or(0, |c| c.refcount)
}

pub fn closure_invalidated(c: RawClosure) -> bool {
    state()
        .closures
        .get(&(c as usize))
        .map_or(false, |c| c.invalidated)
}

/// 模拟外部持有的过期闭包引用, 无参数调用
pub fn invoke_closure(c: RawClosure) {
    let marshal = state().closures.get(&(c as usize)).map(|c| c.marshal);
    if let Some(marshal) = marshal {
        marshal(c, ptr::null_mut(), 0, ptr::null());
    }
}

pub fn new_async_result(
    source: RawObject,
    user_data: *mut (),
    tag: *const (),
    legacy_error: Option<(u32, i32, &str)>,
) -> RawAsyncResult {
    if !source.is_null() {
        object_ref(source);
    }

    let handle = new_object(MOCK_ASYNC_RESULT, false);
    state().results.insert(
        handle as usize,
        MockAsync {
            user_data: user_data as usize,
            source: source as usize,
            tag: tag as usize,
            legacy_error: legacy_error.map(|(d, c, m)| (d, c, m.to_owned())),
            errors_issued: 0,
            errors_freed: 0,
        },
    );

    handle
}

pub fn errors_issued(r: RawAsyncResult) -> usize {
    state().results.get(&(r as usize)).map_or(0, |a| a.errors_issued)
}

pub fn errors_freed(r: RawAsyncResult) -> usize {
    state().results.get(&(r as usize)).map_or(0, |a| a.errors_freed)
}

pub fn bad_frees() -> usize {
    state().bad_frees.load(Ordering::Relaxed)
}
