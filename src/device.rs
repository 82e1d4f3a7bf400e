use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::Backend;
use crate::constants::{
    CCH_VERSION_MAX, DTP_ETHERNET, DTP_PARALLEL, DTP_SERIAL, DTP_USB, HIF_INVALID,
};
use crate::error::{self, ErrorCode, ErrorDescription, Result};
use crate::interface::Interface;
use crate::sys::{Dtp, Dvc};

/// Transport a device is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Usb,
    Ethernet,
    Parallel,
    Serial,
    Other(Dtp),
}

impl Transport {
    pub fn from_raw(dtp: Dtp) -> Self {
        match dtp {
            DTP_USB => Transport::Usb,
            DTP_ETHERNET => Transport::Ethernet,
            DTP_PARALLEL => Transport::Parallel,
            DTP_SERIAL => Transport::Serial,
            other => Transport::Other(other),
        }
    }

    pub fn raw(self) -> Dtp {
        match self {
            Transport::Usb => DTP_USB,
            Transport::Ethernet => DTP_ETHERNET,
            Transport::Parallel => DTP_PARALLEL,
            Transport::Serial => DTP_SERIAL,
            Transport::Other(other) => other,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Usb => write!(f, "USB"),
            Transport::Ethernet => write!(f, "Ethernet"),
            Transport::Parallel => write!(f, "Parallel"),
            Transport::Serial => write!(f, "Serial"),
            Transport::Other(dtp) => write!(f, "dtp {dtp:#06x}"),
        }
    }
}

/// Decoded copy of one enumeration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    /// Connection string accepted by [`Manager::open`].
    pub connection: String,
    pub transport: Transport,
}

impl From<&Dvc> for DeviceInfo {
    fn from(dvc: &Dvc) -> Self {
        Self {
            name: string_from_chars(&dvc.sz_name),
            connection: string_from_chars(&dvc.sz_conn),
            transport: Transport::from_raw(dvc.dtp),
        }
    }
}

/// Entry point to the device manager: version and error queries,
/// enumeration, and opening interface handles.
pub struct Manager<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> Clone for Manager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> Manager<B> {
    pub fn new(backend: B) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    pub fn from_shared(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Version of the device manager library.
    pub fn version(&self) -> Result<String> {
        let mut buffer = [0u8; CCH_VERSION_MAX];
        let ok = self.backend.dmgr_get_version(&mut buffer);
        error::check(&*self.backend, "DmgrGetVersion", ok)?;
        Ok(string_from_buffer(&buffer))
    }

    /// Version of the parallel transport library.
    pub fn transport_version(&self) -> Result<String> {
        let mut buffer = [0u8; CCH_VERSION_MAX];
        let ok = self.backend.depp_get_version(&mut buffer);
        error::check(&*self.backend, "DeppGetVersion", ok)?;
        Ok(string_from_buffer(&buffer))
    }

    /// Returns and clears the calling thread's last error code.
    pub fn last_error(&self) -> ErrorCode {
        ErrorCode(self.backend.dmgr_get_last_error())
    }

    pub fn describe(&self, code: ErrorCode) -> Result<ErrorDescription> {
        match error::describe(&*self.backend, code) {
            Some(description) => Ok(description),
            None => Err(error::failure(&*self.backend, "DmgrSzFromErc")),
        }
    }

    /// Runs a fresh enumeration and returns the number of devices found.
    pub fn enumerate(&self) -> Result<usize> {
        let mut count = 0i32;
        let ok = self.backend.dmgr_enum_devices(&mut count);
        error::check(&*self.backend, "DmgrEnumDevices", ok)?;
        debug!(count, "enumeration complete");
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Entry `index` of the most recent enumeration.
    pub fn device(&self, index: usize) -> Result<DeviceInfo> {
        let mut dvc = Dvc::default();
        let index = i32::try_from(index).unwrap_or(i32::MAX);
        let ok = self.backend.dmgr_get_dvc(index, &mut dvc);
        error::check(&*self.backend, "DmgrGetDvc", ok)?;
        Ok(DeviceInfo::from(&dvc))
    }

    pub fn free_enumeration(&self) -> Result<()> {
        let ok = self.backend.dmgr_free_dvc_enum();
        error::check(&*self.backend, "DmgrFreeDvcEnum", ok)
    }

    /// Enumerates, collects every entry and releases the enumeration again.
    pub fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let count = self.enumerate()?;
        let collected: Result<Vec<DeviceInfo>> =
            (0..count).map(|index| self.device(index)).collect();
        let freed = self.free_enumeration();
        let devices = collected?;
        freed?;
        Ok(devices)
    }

    /// Opens the device matching `selector`, which is either a connection
    /// string or a device name known to the runtime.
    pub fn open(&self, selector: &str) -> Result<Interface<B>> {
        let c_selector = CString::new(selector)?;
        let mut hif = HIF_INVALID;
        let ok = self.backend.dmgr_open(&mut hif, &c_selector);
        error::check(&*self.backend, "DmgrOpen", ok)?;
        info!(selector, hif, "opened interface");
        Ok(Interface::new(Arc::clone(&self.backend), hif, selector))
    }
}

#[cfg(feature = "runtime")]
impl Manager<crate::backend::Runtime> {
    /// Manager backed by the linked Adept runtime.
    pub fn runtime() -> Self {
        Self::new(crate::backend::Runtime)
    }
}

pub(crate) fn string_from_buffer(buffer: &[u8]) -> String {
    match CStr::from_bytes_until_nul(buffer) {
        Ok(text) => text.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(buffer).into_owned(),
    }
}

fn string_from_chars(chars: &[std::os::raw::c_char]) -> String {
    let bytes: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
    string_from_buffer(&bytes)
}
