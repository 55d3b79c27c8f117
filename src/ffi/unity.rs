//! The slice of Unity's native plugin interface registry this plugin reads.

use std::ffi::c_void;

/// 128-bit interface identifier, split in two halves like Unity's headers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnityInterfaceGuid {
    pub high: u64,
    pub low: u64,
}

/// An interface table reachable through [`IUnityInterfaces`].
pub trait UnityInterface {
    const GUID: UnityInterfaceGuid;
}

/// Registry handed to `UnityPluginLoad`.
#[repr(C)]
pub struct IUnityInterfaces {
    pub get_interface: Option<unsafe extern "system" fn(UnityInterfaceGuid) -> *mut c_void>,
    pub register_interface: Option<unsafe extern "system" fn(UnityInterfaceGuid, *mut c_void)>,
    pub get_interface_split: Option<unsafe extern "system" fn(u64, u64) -> *mut c_void>,
    pub register_interface_split: Option<unsafe extern "system" fn(u64, u64, *mut c_void)>,
}

impl IUnityInterfaces {
    /// Looks up `T` by GUID.
    ///
    /// # Safety
    /// The registry must be the live one Unity passed to the load hook.
    pub unsafe fn get<T: UnityInterface>(&self) -> Option<&T> {
        let guid = T::GUID;
        let raw = match (self.get_interface_split, self.get_interface) {
            (Some(split), _) => split(guid.high, guid.low),
            (None, Some(get)) => get(guid),
            (None, None) => return None,
        };
        (raw as *const T).as_ref()
    }
}

/// `IUnityGraphicsD3D11`. Only the leading `GetDevice` slot is declared.
#[repr(C)]
pub struct IUnityGraphicsD3D11 {
    pub get_device: Option<unsafe extern "system" fn() -> *mut c_void>,
}

impl UnityInterface for IUnityGraphicsD3D11 {
    const GUID: UnityInterfaceGuid = UnityInterfaceGuid {
        high: 0xAAB3_7EF8_7A87_D748,
        low: 0xBF76_967F_07EF_B177,
    };
}

impl IUnityGraphicsD3D11 {
    /// The engine's `ID3D11Device*`, or null before the device exists.
    ///
    /// # Safety
    /// `self` must come from [`IUnityInterfaces::get`].
    pub unsafe fn device(&self) -> *mut c_void {
        self.get_device.map_or(std::ptr::null_mut(), |get| get())
    }
}
