//! Window events and the host callback contract.
//!
//! Backends translate native notifications into [`NativeEvent`]s and hand them
//! to [`WindowContext::dispatch`](crate::context::WindowContext::dispatch),
//! which owns the close veto and the fan-out to the host.

use crate::handle::WindowHandle;

/// Event type code passed to the host (`NativeEventType` on the C side).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Closed = 0,
    Moved = 1,
    Resized = 2,
    FocusGained = 3,
    FocusLost = 4,
    Minimized = 5,
    Maximized = 6,
    Restored = 7,
}

impl EventKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => EventKind::Closed,
            1 => EventKind::Moved,
            2 => EventKind::Resized,
            3 => EventKind::FocusGained,
            4 => EventKind::FocusLost,
            5 => EventKind::Minimized,
            6 => EventKind::Maximized,
            7 => EventKind::Restored,
            _ => return None,
        })
    }
}

/// Event delivered to the host: a kind plus two integer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEvent {
    pub kind: EventKind,
    pub data1: i32,
    pub data2: i32,
}

impl HostEvent {
    pub fn new(kind: EventKind, data1: i32, data2: i32) -> Self {
        Self { kind, data1, data2 }
    }

    pub fn closed() -> Self {
        Self::new(EventKind::Closed, 0, 0)
    }
}

/// Platform-neutral notification produced by a backend's event pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// The user or window manager asked to close the window (vetoable).
    CloseRequested,
    Moved { x: i32, y: i32 },
    Resized { width: i32, height: i32 },
    FocusGained,
    FocusLost,
    Minimized,
    Maximized,
    Restored,
}

impl NativeEvent {
    /// Host-facing form of a forwarded event. `CloseRequested` has none: it
    /// goes through the close arbiter and may become [`HostEvent::closed`].
    pub fn to_host(self) -> Option<HostEvent> {
        Some(match self {
            NativeEvent::CloseRequested => return None,
            NativeEvent::Moved { x, y } => HostEvent::new(EventKind::Moved, x, y),
            NativeEvent::Resized { width, height } => {
                HostEvent::new(EventKind::Resized, width, height)
            }
            NativeEvent::FocusGained => HostEvent::new(EventKind::FocusGained, 0, 0),
            NativeEvent::FocusLost => HostEvent::new(EventKind::FocusLost, 0, 0),
            NativeEvent::Minimized => HostEvent::new(EventKind::Minimized, 0, 0),
            NativeEvent::Maximized => HostEvent::new(EventKind::Maximized, 0, 0),
            NativeEvent::Restored => HostEvent::new(EventKind::Restored, 0, 0),
        })
    }
}

/// What the dispatcher did with a native event; backends use it to decide
/// whether default native processing should still run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Forwarded,
    /// Close accepted: `running` is now false.
    CloseAccepted,
    /// Close rejected by the host; the window stays open.
    CloseVetoed,
}

/// Receives window events. Only ever called from the window's render thread.
pub trait EventSink: Send + Sync {
    fn on_event(&self, handle: WindowHandle, event: HostEvent);
}

impl<F> EventSink for F
where
    F: Fn(WindowHandle, HostEvent) + Send + Sync,
{
    fn on_event(&self, handle: WindowHandle, event: HostEvent) {
        self(handle, event)
    }
}

/// Decides whether a close request may proceed. `false` vetoes it.
pub trait CloseArbiter: Send + Sync {
    fn allow_close(&self, handle: WindowHandle) -> bool;
}

impl<F> CloseArbiter for F
where
    F: Fn(WindowHandle) -> bool + Send + Sync,
{
    fn allow_close(&self, handle: WindowHandle) -> bool {
        self(handle)
    }
}
