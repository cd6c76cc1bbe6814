//! Binding to the vendor's `libmilconnapi` (`milconnapi.dll` on Windows).

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::ptr::{addr_of_mut, NonNull};

use milconn_value::{Address, VarKind, WireValue};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::{validate_host, Transport};

#[allow(non_upper_case_globals)]
#[link(name = "milconnapi")]
extern "C" {
    fn create_client() -> *mut c_void;
    fn destroy_client(handle: *mut c_void);

    fn connect_to_server(handle: *mut c_void, host: *const c_char, port: i32) -> bool;
    fn disconnect_from_server(handle: *mut c_void);
    fn is_connected(handle: *mut c_void) -> bool;

    fn process_messages(handle: *mut c_void);
    fn request_value(handle: *mut c_void, address: u32, kind: i32);

    fn get_bool_value(handle: *mut c_void, address: u32, out: *mut bool) -> bool;
    fn get_byte_value(handle: *mut c_void, address: u32, out: *mut u8) -> bool;
    fn get_word_value(handle: *mut c_void, address: u32, out: *mut u16) -> bool;
    fn get_dword_value(handle: *mut c_void, address: u32, out: *mut u32) -> bool;
    fn get_lword_value(handle: *mut c_void, address: u32, out: *mut u64) -> bool;

    fn set_bool_value(handle: *mut c_void, address: u32, value: bool) -> bool;
    fn set_byte_value(handle: *mut c_void, address: u32, value: u8) -> bool;
    fn set_word_value(handle: *mut c_void, address: u32, value: u16) -> bool;
    fn set_dword_value(handle: *mut c_void, address: u32, value: u32) -> bool;
    fn set_lword_value(handle: *mut c_void, address: u32, value: u64) -> bool;

    static mut BoolCameFromServer: bool;
    static mut ByteCameFromServer: bool;
    static mut WordCameFromServer: bool;
    static mut DWordCameFromServer: bool;
    static mut LWordCameFromServer: bool;
}

/// Client instance allocated by `create_client`.
#[derive(Debug)]
pub struct NativeHandle(NonNull<c_void>);

// SAFETY: the library does not tie a client instance to the allocating thread.
// milconn serializes every call on a handle behind its session lock.
unsafe impl Send for NativeHandle {}
// SAFETY: see above; shared references are only used under the session lock.
unsafe impl Sync for NativeHandle {}

impl NativeHandle {
    fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// [`Transport`] backed by `libmilconnapi`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTransport;

impl NativeTransport {
    pub fn new() -> Self {
        Self
    }
}

fn marker(kind: VarKind) -> *mut bool {
    // SAFETY: taking the address of an extern static does not read it.
    unsafe {
        match kind {
            VarKind::Bool => addr_of_mut!(BoolCameFromServer),
            VarKind::Byte => addr_of_mut!(ByteCameFromServer),
            VarKind::Word => addr_of_mut!(WordCameFromServer),
            VarKind::DWord => addr_of_mut!(DWordCameFromServer),
            VarKind::LWord => addr_of_mut!(LWordCameFromServer),
        }
    }
}

macro_rules! read_out {
    ($getter:ident, $handle:expr, $address:expr, $ty:ty, $variant:ident) => {{
        let mut out = <$ty>::default();
        // SAFETY: handle is live (owned by the caller); `out` is a valid,
        // writable location of the type the library expects.
        let ok = unsafe { $getter($handle.as_ptr(), $address, &mut out) };
        ok.then_some(WireValue::$variant(out))
    }};
}

impl Transport for NativeTransport {
    type Handle = NativeHandle;

    fn create_client(&self) -> Result<NativeHandle> {
        // SAFETY: no preconditions.
        let raw = unsafe { create_client() };
        let handle = NonNull::new(raw).ok_or(TransportError::CreateFailed)?;
        debug!("native client instance created");
        Ok(NativeHandle(handle))
    }

    fn destroy_client(&self, handle: NativeHandle) {
        // SAFETY: handle came from create_client and is consumed here.
        unsafe { destroy_client(handle.as_ptr()) };
        debug!("native client instance destroyed");
    }

    fn connect_to_server(&self, handle: &NativeHandle, host: &str, port: u16) -> bool {
        if let Err(err) = validate_host(host) {
            warn!(%err, "refusing native connect");
            return false;
        }
        let Ok(c_host) = CString::new(host) else {
            return false;
        };
        // SAFETY: handle is live; c_host outlives the call.
        unsafe { connect_to_server(handle.as_ptr(), c_host.as_ptr(), i32::from(port)) }
    }

    fn disconnect_from_server(&self, handle: &NativeHandle) {
        // SAFETY: handle is live.
        unsafe { disconnect_from_server(handle.as_ptr()) }
    }

    fn is_connected(&self, handle: &NativeHandle) -> bool {
        // SAFETY: handle is live.
        unsafe { is_connected(handle.as_ptr()) }
    }

    fn process_messages(&self, handle: &NativeHandle) {
        // SAFETY: handle is live.
        unsafe { process_messages(handle.as_ptr()) }
    }

    fn request_value(&self, handle: &NativeHandle, address: Address, kind: VarKind) {
        // SAFETY: handle is live; kind is one of the library's enum values.
        unsafe { request_value(handle.as_ptr(), address, i32::from(kind.as_u8())) }
    }

    fn get_value(&self, handle: &NativeHandle, address: Address, kind: VarKind) -> Option<WireValue> {
        match kind {
            VarKind::Bool => read_out!(get_bool_value, handle, address, bool, Bool),
            VarKind::Byte => read_out!(get_byte_value, handle, address, u8, Byte),
            VarKind::Word => read_out!(get_word_value, handle, address, u16, Word),
            VarKind::DWord => read_out!(get_dword_value, handle, address, u32, DWord),
            VarKind::LWord => read_out!(get_lword_value, handle, address, u64, LWord),
        }
    }

    fn set_value(&self, handle: &NativeHandle, address: Address, value: WireValue) -> bool {
        let ptr = handle.as_ptr();
        // SAFETY: handle is live; values are passed by copy.
        unsafe {
            match value {
                WireValue::Bool(v) => set_bool_value(ptr, address, v),
                WireValue::Byte(v) => set_byte_value(ptr, address, v),
                WireValue::Word(v) => set_word_value(ptr, address, v),
                WireValue::DWord(v) => set_dword_value(ptr, address, v),
                WireValue::LWord(v) => set_lword_value(ptr, address, v),
            }
        }
    }

    fn arrived(&self, kind: VarKind) -> bool {
        // SAFETY: the marker is a plain `bool` written by the library's
        // processing cycle; volatile keeps the read from being cached.
        unsafe { marker(kind).read_volatile() }
    }

    fn clear_arrived(&self, kind: VarKind) {
        // SAFETY: see `arrived`.
        unsafe { marker(kind).write_volatile(false) }
    }
}
