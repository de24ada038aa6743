//! Locating and loading the OptiX driver library.
//!
//! OptiX ships inside the display driver rather than as a redistributable.
//! On Linux the loader finds `libnvoptix.so.1` on the default search path.
//! On Windows it lives either in the system directory or next to the
//! driver's OpenGL ICD, which is found through the device registry.

use crate::error::{Error, Result};
use libloading::Library;
use optix_bridge_sys::OptixResult;
use std::path::{Path, PathBuf};

/// Environment variable overriding the library path.
pub const LIBRARY_PATH_ENV: &str = "OPTIX_LIBRARY_PATH";

/// File name of the OptiX driver library on this platform.
#[cfg(windows)]
pub const LIBRARY_NAME: &str = "nvoptix.dll";
#[cfg(not(windows))]
pub const LIBRARY_NAME: &str = "libnvoptix.so.1";

/// Where to load OptiX from.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    library_path: Option<PathBuf>,
}

impl LoaderConfig {
    /// Default search: override variable, then the platform locations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load exactly this file instead of searching.
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// The explicit path, from the builder or `OPTIX_LIBRARY_PATH`.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.library_path.clone().or_else(|| {
            std::env::var_os(LIBRARY_PATH_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
    }
}

fn open(path: impl AsRef<std::ffi::OsStr>) -> std::result::Result<Library, libloading::Error> {
    // SAFETY: the OptiX library has no load-time initialization with
    // preconditions on the caller.
    unsafe { Library::new(path) }
}

/// Find and load the OptiX driver library.
pub fn locate_and_load(config: &LoaderConfig) -> Result<Library> {
    if let Some(path) = config.resolved_path() {
        tracing::info!("Loading OptiX from {}", path.display());
        return open(&path).map_err(|e| Error::Load(format!("{}: {e}", path.display())));
    }
    platform::load_default()
}

fn not_found(detail: String) -> Error {
    Error::Optix {
        result: OptixResult::ERROR_LIBRARY_NOT_FOUND,
        log: detail,
    }
}

/// Split a double-NUL-terminated UTF-16 string list, dropping empty entries.
pub fn parse_multi_sz(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|&c| c == 0)
        .filter(|s| !s.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

/// Path of `file` in the directory containing `driver_path`.
pub fn driver_sibling(driver_path: &Path, file: &str) -> PathBuf {
    driver_path
        .parent()
        .map_or_else(|| PathBuf::from(file), |dir| dir.join(file))
}

#[cfg(not(windows))]
mod platform {
    use super::{not_found, open, LIBRARY_NAME};
    use crate::error::Result;
    use libloading::Library;

    pub(super) fn load_default() -> Result<Library> {
        let library = open(LIBRARY_NAME).map_err(|e| not_found(e.to_string()))?;
        tracing::info!("Loaded {}", LIBRARY_NAME);
        Ok(library)
    }
}

#[cfg(windows)]
mod platform {
    use super::{driver_sibling, not_found, open, parse_multi_sz, LIBRARY_NAME};
    use crate::error::Result;
    use libloading::Library;
    use std::ffi::{c_void, OsStr, OsString};
    use std::os::windows::ffi::{OsStrExt, OsStringExt};
    use std::path::PathBuf;

    type Hkey = *mut c_void;
    type DevInst = u32;
    type ConfigRet = u32;

    const CR_SUCCESS: ConfigRet = 0;
    const CM_GETIDLIST_FILTER_PRESENT: u32 = 0x0000_0100;
    const CM_GETIDLIST_FILTER_CLASS: u32 = 0x0000_0200;
    const CM_LOCATE_DEVNODE_NORMAL: u32 = 0;
    const REG_DISPOSITION_OPEN_EXISTING: u32 = 1;
    const CM_REGISTRY_SOFTWARE: u32 = 1;
    const KEY_QUERY_VALUE: u32 = 0x0001;
    const ERROR_SUCCESS: i32 = 0;
    const REG_SZ: u32 = 1;
    const REG_MULTI_SZ: u32 = 7;

    const DISPLAY_CLASS_GUID: &str = "{4d36e968-e325-11ce-bfc1-08002be10318}";
    const DRIVER_VALUE_NAME: &str = "OpenGLDriverName";

    type GetSystemDirectoryW = unsafe extern "system" fn(*mut u16, u32) -> u32;
    type CmGetDeviceIdListSizeW = unsafe extern "system" fn(*mut u32, *const u16, u32) -> ConfigRet;
    type CmGetDeviceIdListW = unsafe extern "system" fn(*const u16, *mut u16, u32, u32) -> ConfigRet;
    type CmLocateDevNodeW = unsafe extern "system" fn(*mut DevInst, *const u16, u32) -> ConfigRet;
    type CmOpenDevNodeKey =
        unsafe extern "system" fn(DevInst, u32, u32, u32, *mut Hkey, u32) -> ConfigRet;
    type RegQueryValueExW =
        unsafe extern "system" fn(Hkey, *const u16, *mut u32, *mut u32, *mut u8, *mut u32) -> i32;
    type RegCloseKey = unsafe extern "system" fn(Hkey) -> i32;

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
    }

    unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Option<T> {
        // SAFETY: caller names a symbol whose signature matches `T`.
        unsafe { library.get::<T>(name).ok().map(|s| *s) }
    }

    pub(super) fn load_default() -> Result<Library> {
        let mut attempts = Vec::new();

        if let Some(dir) = system_directory() {
            let path = dir.join(LIBRARY_NAME);
            match open(&path) {
                Ok(library) => {
                    tracing::info!("Loaded {}", path.display());
                    return Ok(library);
                }
                Err(e) => attempts.push(format!("{}: {e}", path.display())),
            }
        }

        match DeviceRegistry::open() {
            Some(registry) => {
                for device in registry.display_devices() {
                    let Some(driver) = registry.opengl_driver_path(&device) else {
                        tracing::debug!("No OpenGL driver registered for {}", device);
                        continue;
                    };
                    let path = driver_sibling(&driver, LIBRARY_NAME);
                    match open(&path) {
                        Ok(library) => {
                            tracing::info!("Loaded {} via {}", path.display(), device);
                            return Ok(library);
                        }
                        Err(e) => attempts.push(format!("{}: {e}", path.display())),
                    }
                }
            }
            None => attempts.push("Configuration Manager unavailable".to_string()),
        }

        Err(not_found(attempts.join("\n")))
    }

    fn system_directory() -> Option<PathBuf> {
        let kernel32 = open("kernel32.dll").ok()?;
        // SAFETY: signature matches the Win32 declaration.
        let get: GetSystemDirectoryW = unsafe { symbol(&kernel32, b"GetSystemDirectoryW\0")? };
        let mut buffer = vec![0u16; 260];
        // SAFETY: buffer holds `buffer.len()` wide chars.
        let len = unsafe { get(buffer.as_mut_ptr(), buffer.len() as u32) } as usize;
        if len == 0 || len > buffer.len() {
            return None;
        }
        buffer.truncate(len);
        Some(PathBuf::from(OsString::from_wide(&buffer)))
    }

    /// Configuration Manager and registry entry points, resolved at runtime.
    struct DeviceRegistry {
        _cfgmgr32: Library,
        _advapi32: Library,
        get_id_list_size: CmGetDeviceIdListSizeW,
        get_id_list: CmGetDeviceIdListW,
        locate_dev_node: CmLocateDevNodeW,
        open_dev_node_key: CmOpenDevNodeKey,
        query_value: RegQueryValueExW,
        close_key: RegCloseKey,
    }

    impl DeviceRegistry {
        fn open() -> Option<Self> {
            let cfgmgr32 = open("cfgmgr32.dll").ok()?;
            let advapi32 = open("advapi32.dll").ok()?;
            // SAFETY: each signature matches its Win32 declaration.
            unsafe {
                Some(Self {
                    get_id_list_size: symbol(&cfgmgr32, b"CM_Get_Device_ID_List_SizeW\0")?,
                    get_id_list: symbol(&cfgmgr32, b"CM_Get_Device_ID_ListW\0")?,
                    locate_dev_node: symbol(&cfgmgr32, b"CM_Locate_DevNodeW\0")?,
                    open_dev_node_key: symbol(&cfgmgr32, b"CM_Open_DevNode_Key\0")?,
                    query_value: symbol(&advapi32, b"RegQueryValueExW\0")?,
                    close_key: symbol(&advapi32, b"RegCloseKey\0")?,
                    _cfgmgr32: cfgmgr32,
                    _advapi32: advapi32,
                })
            }
        }

        /// Instance IDs of present display-class devices.
        fn display_devices(&self) -> Vec<String> {
            let filter = wide(DISPLAY_CLASS_GUID);
            let flags = CM_GETIDLIST_FILTER_CLASS | CM_GETIDLIST_FILTER_PRESENT;

            let mut len = 0u32;
            // SAFETY: `len` is a valid out pointer, `filter` is NUL-terminated.
            if unsafe { (self.get_id_list_size)(&mut len, filter.as_ptr(), flags) } != CR_SUCCESS {
                return Vec::new();
            }
            let mut buffer = vec![0u16; len as usize];
            // SAFETY: buffer holds `len` wide chars.
            let status =
                unsafe { (self.get_id_list)(filter.as_ptr(), buffer.as_mut_ptr(), len, flags) };
            if status != CR_SUCCESS {
                return Vec::new();
            }
            parse_multi_sz(&buffer)
        }

        /// `OpenGLDriverName` from the device's software key.
        fn opengl_driver_path(&self, device: &str) -> Option<PathBuf> {
            let id = wide(device);
            let mut node: DevInst = 0;
            // SAFETY: `node` is a valid out pointer, `id` is NUL-terminated.
            if unsafe { (self.locate_dev_node)(&mut node, id.as_ptr(), CM_LOCATE_DEVNODE_NORMAL) }
                != CR_SUCCESS
            {
                return None;
            }

            let mut key: Hkey = std::ptr::null_mut();
            // SAFETY: `key` is a valid out pointer.
            let status = unsafe {
                (self.open_dev_node_key)(
                    node,
                    KEY_QUERY_VALUE,
                    0,
                    REG_DISPOSITION_OPEN_EXISTING,
                    &mut key,
                    CM_REGISTRY_SOFTWARE,
                )
            };
            if status != CR_SUCCESS {
                return None;
            }

            let value = self.query_string_value(key, DRIVER_VALUE_NAME);
            // SAFETY: `key` was opened above and is closed once.
            unsafe { (self.close_key)(key) };
            value.map(PathBuf::from)
        }

        /// A `REG_SZ` value, or the first entry of a `REG_MULTI_SZ` value.
        fn query_string_value(&self, key: Hkey, name: &str) -> Option<String> {
            let name = wide(name);
            let mut kind = 0u32;
            let mut size = 0u32;
            // SAFETY: size query with a null data pointer.
            let status = unsafe {
                (self.query_value)(
                    key,
                    name.as_ptr(),
                    std::ptr::null_mut(),
                    &mut kind,
                    std::ptr::null_mut(),
                    &mut size,
                )
            };
            if status != ERROR_SUCCESS || (kind != REG_SZ && kind != REG_MULTI_SZ) {
                return None;
            }

            let mut data = vec![0u16; (size as usize).div_ceil(2) + 1];
            let mut byte_len = (data.len() * 2) as u32;
            // SAFETY: `data` holds `byte_len` bytes.
            let status = unsafe {
                (self.query_value)(
                    key,
                    name.as_ptr(),
                    std::ptr::null_mut(),
                    &mut kind,
                    data.as_mut_ptr().cast(),
                    &mut byte_len,
                )
            };
            if status != ERROR_SUCCESS {
                return None;
            }
            data.truncate((byte_len as usize) / 2);
            parse_multi_sz(&data).into_iter().next()
        }
    }
}
