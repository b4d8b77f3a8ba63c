//! X11 RECORD extension provider (Linux).
//!
//! Uses two Xlib connections per session, as the extension requires: the
//! data connection is handed to `XRecordEnableContext` (or its async variant)
//! and is busy for the whole session, while the control connection performs
//! the handshake and later disables and frees the context.
//!
//! Records arrive as raw 32-byte core protocol events in the intercept
//! callback; they are decoded with [`inputhook_core::decode_x11_event`] and
//! freed before the callback returns.

use std::collections::VecDeque;
use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use inputhook_core::{decode_x11_event, KeyTranslationTable, X11KeyTable};
use tracing::{debug, trace, warn};
use x11::xlib;
use x11::xrecord::{self, XRecordClientSpec, XRecordContext, XRecordInterceptData, XRecordRange};

use crate::application::engine::HookError;
use crate::application::pipeline::panic_message;
use crate::application::provider::{DeliveryMode, RecordProvider, SourceSignal};

// XRecordInterceptData categories (record.h).
const RECORD_FROM_SERVER: c_int = 0;
const RECORD_START_OF_DATA: c_int = 4;
const RECORD_END_OF_DATA: c_int = 5;

// XRecordAllClients client spec.
const RECORD_ALL_CLIENTS: XRecordClientSpec = 3;

// Core event codes bounding the recorded device events.
const KEY_PRESS: u8 = 2;
const MOTION_NOTIFY: u8 = 6;

static XLIB_THREADS: Once = Once::new();

/// An open Xlib display.
#[derive(Debug)]
pub struct XConnection(NonNull<xlib::Display>);

// SAFETY: Xlib is initialised with XInitThreads before any display is opened,
// and the engine never uses one connection from two threads at once.
unsafe impl Send for XConnection {}
unsafe impl Sync for XConnection {}

impl XConnection {
    fn as_ptr(&self) -> *mut xlib::Display {
        self.0.as_ptr()
    }
}

/// A range allocated with `XRecordAllocRange`; freed on drop.
pub struct XRange(NonNull<XRecordRange>);

impl Drop for XRange {
    fn drop(&mut self) {
        // SAFETY: allocated by XRecordAllocRange and freed exactly once here.
        unsafe {
            xlib::XFree(self.0.as_ptr().cast::<c_void>());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XContext(XRecordContext);

/// [`RecordProvider`] over the X11 RECORD extension.
pub struct X11RecordProvider {
    mode: DeliveryMode,
    /// Signals decoded by the async callback, drained by `process_pending`.
    pending: Mutex<VecDeque<SourceSignal>>,
}

impl X11RecordProvider {
    pub fn new(mode: DeliveryMode) -> Self {
        XLIB_THREADS.call_once(|| {
            // SAFETY: called once, before any other Xlib call by this crate.
            unsafe {
                xlib::XInitThreads();
            }
        });
        Self {
            mode,
            pending: Mutex::new(VecDeque::new()),
        }
    }
}

impl RecordProvider for X11RecordProvider {
    type Connection = XConnection;
    type Range = XRange;
    type Context = XContext;

    fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    fn open(&self, display_name: Option<&str>) -> Result<XConnection, HookError> {
        let label = display_name.unwrap_or("$DISPLAY").to_string();
        let name = display_name
            .map(CString::new)
            .transpose()
            .map_err(|_| HookError::Connection { display: label.clone() })?;
        let name_ptr = name.as_ref().map_or(ptr::null(), |n| n.as_ptr());

        // SAFETY: name_ptr is null or a valid NUL-terminated string for this call.
        let display = unsafe { xlib::XOpenDisplay(name_ptr) };
        let display = NonNull::new(display).ok_or(HookError::Connection { display: label })?;
        debug!("X display connection opened");
        Ok(XConnection(display))
    }

    fn query_version(&self, control: &XConnection) -> Result<(i32, i32), HookError> {
        let (mut major, mut minor) = (0, 0);
        // SAFETY: valid display; out-pointers live for the call.
        let status = unsafe { xrecord::XRecordQueryVersion(control.as_ptr(), &mut major, &mut minor) };
        if status == 0 {
            return Err(HookError::ExtensionUnavailable(
                "RECORD extension not present on display".into(),
            ));
        }
        Ok((major, minor))
    }

    fn key_table(&self, control: &XConnection) -> Result<Arc<dyn KeyTranslationTable>, HookError> {
        let (mut min_keycode, mut max_keycode) = (0, 0);
        let mut per_keycode = 0;

        // SAFETY: valid display; the returned array holds count * per_keycode
        // KeySyms and is freed with XFree after copying.
        let keysyms = unsafe {
            xlib::XDisplayKeycodes(control.as_ptr(), &mut min_keycode, &mut max_keycode);
            let count = max_keycode - min_keycode + 1;
            let mapping = xlib::XGetKeyboardMapping(
                control.as_ptr(),
                min_keycode as xlib::KeyCode,
                count,
                &mut per_keycode,
            );
            if mapping.is_null() {
                return Err(HookError::ResourceAllocation("keyboard mapping unavailable".into()));
            }
            let len = usize::try_from(count * per_keycode).unwrap_or(0);
            let copied = slice::from_raw_parts(mapping, len)
                .iter()
                .map(|&sym| sym as u32)
                .collect::<Vec<_>>();
            xlib::XFree(mapping.cast::<c_void>());
            copied
        };

        let table = X11KeyTable::new(
            u8::try_from(min_keycode).unwrap_or(8),
            usize::try_from(per_keycode).unwrap_or(0),
            keysyms,
        )
        .map_err(|e| HookError::ResourceAllocation(e.to_string()))?;
        debug!(keycodes = table.keycode_count(), "keyboard mapping loaded");
        Ok(Arc::new(table))
    }

    fn multi_click_time(&self, control: &XConnection) -> Option<Duration> {
        // SAFETY: valid display and static NUL-terminated strings; the result
        // is owned by Xlib and only read here.
        let value = unsafe {
            let raw = xlib::XGetDefault(
                control.as_ptr(),
                b"*\0".as_ptr().cast::<c_char>(),
                b"multiClickTime\0".as_ptr().cast::<c_char>(),
            );
            if raw.is_null() {
                return None;
            }
            CStr::from_ptr(raw).to_string_lossy().into_owned()
        };
        value.trim().parse::<u64>().ok().map(Duration::from_millis)
    }

    fn alloc_range(&self) -> Result<XRange, HookError> {
        // SAFETY: returns a zeroed range or null.
        let range = unsafe { xrecord::XRecordAllocRange() };
        let range = NonNull::new(range)
            .ok_or_else(|| HookError::ResourceAllocation("XRecordAllocRange failed".into()))?;
        // SAFETY: range is a valid, exclusively owned allocation.
        unsafe {
            let fields = &mut *range.as_ptr();
            fields.device_events.first = KEY_PRESS;
            fields.device_events.last = MOTION_NOTIFY;
        }
        Ok(XRange(range))
    }

    fn create_context(&self, data: &XConnection, range: XRange) -> Result<XContext, HookError> {
        let mut clients = RECORD_ALL_CLIENTS;
        let mut ranges = range.0.as_ptr();
        // SAFETY: valid display; clients and ranges point at one element each.
        let context =
            unsafe { xrecord::XRecordCreateContext(data.as_ptr(), 0, &mut clients, 1, &mut ranges, 1) };
        drop(range);
        if context == 0 {
            return Err(HookError::ResourceAllocation("XRecordCreateContext failed".into()));
        }
        // Make sure the server has the context before another connection uses it.
        // SAFETY: valid display.
        unsafe {
            xlib::XSync(data.as_ptr(), xlib::False);
        }
        Ok(XContext(context))
    }

    fn enable(
        &self,
        data: &XConnection,
        context: XContext,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError> {
        let mut sink: &mut dyn FnMut(SourceSignal) = sink;
        let closure = ptr::addr_of_mut!(sink).cast::<c_char>();
        // SAFETY: `closure` points at `sink`, which outlives this blocking call;
        // the callback only runs inside it on this thread.
        let status = unsafe {
            xrecord::XRecordEnableContext(data.as_ptr(), context.0, Some(blocking_callback), closure)
        };
        if status == 0 {
            return Err(HookError::ContextEnable("XRecordEnableContext failed".into()));
        }
        Ok(())
    }

    fn enable_async(&self, data: &XConnection, context: XContext) -> Result<(), HookError> {
        let closure = ptr::addr_of!(self.pending).cast_mut().cast::<c_char>();
        // SAFETY: the provider outlives the session (the engine holds it in an
        // Arc until the worker is joined); callbacks run inside
        // XRecordProcessReplies on the worker thread.
        let status = unsafe {
            xrecord::XRecordEnableContextAsync(data.as_ptr(), context.0, Some(queue_callback), closure)
        };
        if status == 0 {
            return Err(HookError::ContextEnable("XRecordEnableContextAsync failed".into()));
        }
        Ok(())
    }

    fn process_pending(
        &self,
        data: &XConnection,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError> {
        // SAFETY: valid display owned by the worker for this session.
        unsafe {
            xrecord::XRecordProcessReplies(data.as_ptr());
        }
        let drained: Vec<SourceSignal> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        drained.into_iter().for_each(sink);
        Ok(())
    }

    fn disable(&self, control: &XConnection, context: XContext) -> Result<(), HookError> {
        // SAFETY: valid display and context.
        let status = unsafe { xrecord::XRecordDisableContext(control.as_ptr(), context.0) };
        if status == 0 {
            return Err(HookError::ContextDisable("XRecordDisableContext failed".into()));
        }
        // Flush so the data connection sees EndOfData promptly.
        // SAFETY: valid display.
        unsafe {
            xlib::XSync(control.as_ptr(), xlib::False);
        }
        Ok(())
    }

    fn free_context(&self, control: &XConnection, context: XContext) {
        // SAFETY: valid display; the context is not used afterwards.
        unsafe {
            xrecord::XRecordFreeContext(control.as_ptr(), context.0);
        }
    }

    fn close(&self, connection: XConnection) {
        // SAFETY: the display is closed once and never used again.
        unsafe {
            xlib::XCloseDisplay(connection.as_ptr());
        }
        debug!("X display connection closed");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Decodes one intercepted record.
///
/// # Safety
///
/// `data` must be a valid record handed over by Xlib.
unsafe fn signal_from(data: &XRecordInterceptData) -> Option<SourceSignal> {
    match data.category {
        RECORD_START_OF_DATA => Some(SourceSignal::Started),
        RECORD_END_OF_DATA => Some(SourceSignal::Ended),
        RECORD_FROM_SERVER if !data.data.is_null() => {
            // data_len counts 4-byte units.
            let len = usize::try_from(data.data_len).unwrap_or(0) * 4;
            let bytes = slice::from_raw_parts(data.data.cast_const(), len);
            decode_x11_event(bytes, data.client_swapped != 0, now_ms()).map(SourceSignal::Event)
        }
        other => {
            trace!(category = other, "record category ignored");
            None
        }
    }
}

/// Runs `f` on the record, then frees it.  Panics never cross into Xlib.
unsafe fn consume(data: *mut XRecordInterceptData, f: impl FnOnce(SourceSignal)) {
    if data.is_null() {
        return;
    }
    contain(|| {
        if let Some(signal) = signal_from(&*data) {
            f(signal);
        }
    });
    xrecord::XRecordFreeData(data);
}

/// Runs `f`, logging instead of propagating a panic.  Returns whether it
/// completed.
fn contain(f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            warn!(panic = panic_message(payload.as_ref()), "record callback panicked");
            false
        }
    }
}

unsafe extern "C" fn blocking_callback(closure: *mut c_char, data: *mut XRecordInterceptData) {
    let sink = &mut *closure.cast::<&mut dyn FnMut(SourceSignal)>();
    consume(data, |signal| sink(signal));
}

unsafe extern "C" fn queue_callback(closure: *mut c_char, data: *mut XRecordInterceptData) {
    let pending = &*closure.cast_const().cast::<Mutex<VecDeque<SourceSignal>>>();
    consume(data, |signal| {
        pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(signal);
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
