//! One method per native entry point.
//!
//! [`Backend`] keeps the vendor contract intact: every call answers with a
//! success flag, outputs land in caller-owned buffers, and the cause of a
//! failure is left in the calling thread's error slot for
//! [`Backend::dmgr_get_last_error`]. The only liberty taken is that buffers
//! travel as slices, so each count argument is derived from the buffer it
//! describes.

use std::ffi::CStr;

use crate::constants::{CCH_ERC_MAX, CCH_ERC_MSG_MAX, CCH_VERSION_MAX};
use crate::sys::{Dprp, Dvc, Erc, Hif};

pub trait Backend: Send + Sync {
    fn dmgr_get_version(&self, version: &mut [u8; CCH_VERSION_MAX]) -> bool;
    fn dmgr_get_last_error(&self) -> Erc;
    fn dmgr_sz_from_erc(
        &self,
        erc: Erc,
        name: &mut [u8; CCH_ERC_MAX],
        message: &mut [u8; CCH_ERC_MSG_MAX],
    ) -> bool;
    fn dmgr_enum_devices(&self, count: &mut i32) -> bool;
    fn dmgr_get_dvc(&self, index: i32, dvc: &mut Dvc) -> bool;
    fn dmgr_free_dvc_enum(&self) -> bool;
    fn dmgr_open(&self, hif: &mut Hif, selector: &CStr) -> bool;
    fn dmgr_close(&self, hif: Hif) -> bool;

    fn depp_get_version(&self, version: &mut [u8; CCH_VERSION_MAX]) -> bool;
    fn depp_get_port_count(&self, hif: Hif, count: &mut i32) -> bool;
    fn depp_get_port_properties(&self, hif: Hif, port: i32, properties: &mut Dprp) -> bool;
    fn depp_enable(&self, hif: Hif) -> bool;
    fn depp_enable_ex(&self, hif: Hif, port: i32) -> bool;
    fn depp_disable(&self, hif: Hif) -> bool;
    fn depp_put_reg(&self, hif: Hif, addr: u8, data: u8, overlap: bool) -> bool;
    fn depp_get_reg(&self, hif: Hif, addr: u8, data: &mut u8, overlap: bool) -> bool;
    /// `addr_data` is the flattened `addr, data, addr, data, ...` buffer. An
    /// odd length fails without reaching the device.
    fn depp_put_reg_set(&self, hif: Hif, addr_data: &[u8], overlap: bool) -> bool;
    /// `addrs` and `data` must have the same length; a mismatch fails without
    /// reaching the device.
    fn depp_get_reg_set(&self, hif: Hif, addrs: &[u8], data: &mut [u8], overlap: bool) -> bool;
    fn depp_put_reg_repeat(&self, hif: Hif, addr: u8, data: &[u8], overlap: bool) -> bool;
    fn depp_get_reg_repeat(&self, hif: Hif, addr: u8, data: &mut [u8], overlap: bool) -> bool;
    fn depp_set_timeout(&self, hif: Hif, requested_ns: u32, actual_ns: &mut u32) -> bool;
}

/// Pair count of a flattened address/data buffer, `None` for an odd length.
#[cfg_attr(not(feature = "runtime"), allow(dead_code))]
pub(crate) fn pair_count(addr_data: &[u8]) -> Option<u32> {
    if addr_data.len() % 2 != 0 {
        return None;
    }
    u32::try_from(addr_data.len() / 2).ok()
}

/// Byte count of a register-set read, `None` unless both buffers agree.
#[cfg_attr(not(feature = "runtime"), allow(dead_code))]
pub(crate) fn reg_set_len(addrs: &[u8], data: &[u8]) -> Option<u32> {
    if addrs.len() != data.len() {
        return None;
    }
    u32::try_from(data.len()).ok()
}

/// Forwards every call to the linked Adept runtime.
#[cfg(feature = "runtime")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Runtime;

#[cfg(feature = "runtime")]
mod runtime {
    use std::ffi::CStr;

    use super::{Backend, Runtime, pair_count, reg_set_len};
    use crate::constants::{CCH_ERC_MAX, CCH_ERC_MSG_MAX, CCH_VERSION_MAX};
    use crate::sys::{self, Bool, Dprp, Dvc, Erc, Hif};

    fn flag(value: bool) -> Bool {
        Bool::from(value)
    }

    // Capped at the native range, so the runtime never touches more than the
    // buffer holds.
    fn count(len: usize) -> u32 {
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    impl Backend for Runtime {
        fn dmgr_get_version(&self, version: &mut [u8; CCH_VERSION_MAX]) -> bool {
            unsafe { sys::DmgrGetVersion(version.as_mut_ptr().cast()) != 0 }
        }

        fn dmgr_get_last_error(&self) -> Erc {
            unsafe { sys::DmgrGetLastError() }
        }

        fn dmgr_sz_from_erc(
            &self,
            erc: Erc,
            name: &mut [u8; CCH_ERC_MAX],
            message: &mut [u8; CCH_ERC_MSG_MAX],
        ) -> bool {
            unsafe {
                sys::DmgrSzFromErc(erc, name.as_mut_ptr().cast(), message.as_mut_ptr().cast()) != 0
            }
        }

        fn dmgr_enum_devices(&self, count: &mut i32) -> bool {
            unsafe { sys::DmgrEnumDevices(count) != 0 }
        }

        fn dmgr_get_dvc(&self, index: i32, dvc: &mut Dvc) -> bool {
            unsafe { sys::DmgrGetDvc(index, dvc) != 0 }
        }

        fn dmgr_free_dvc_enum(&self) -> bool {
            unsafe { sys::DmgrFreeDvcEnum() != 0 }
        }

        fn dmgr_open(&self, hif: &mut Hif, selector: &CStr) -> bool {
            unsafe { sys::DmgrOpen(hif, selector.as_ptr()) != 0 }
        }

        fn dmgr_close(&self, hif: Hif) -> bool {
            unsafe { sys::DmgrClose(hif) != 0 }
        }

        fn depp_get_version(&self, version: &mut [u8; CCH_VERSION_MAX]) -> bool {
            unsafe { sys::DeppGetVersion(version.as_mut_ptr().cast()) != 0 }
        }

        fn depp_get_port_count(&self, hif: Hif, count: &mut i32) -> bool {
            unsafe { sys::DeppGetPortCount(hif, count) != 0 }
        }

        fn depp_get_port_properties(&self, hif: Hif, port: i32, properties: &mut Dprp) -> bool {
            unsafe { sys::DeppGetPortProperties(hif, port, properties) != 0 }
        }

        fn depp_enable(&self, hif: Hif) -> bool {
            unsafe { sys::DeppEnable(hif) != 0 }
        }

        fn depp_enable_ex(&self, hif: Hif, port: i32) -> bool {
            unsafe { sys::DeppEnableEx(hif, port) != 0 }
        }

        fn depp_disable(&self, hif: Hif) -> bool {
            unsafe { sys::DeppDisable(hif) != 0 }
        }

        fn depp_put_reg(&self, hif: Hif, addr: u8, data: u8, overlap: bool) -> bool {
            unsafe { sys::DeppPutReg(hif, addr, data, flag(overlap)) != 0 }
        }

        fn depp_get_reg(&self, hif: Hif, addr: u8, data: &mut u8, overlap: bool) -> bool {
            unsafe { sys::DeppGetReg(hif, addr, data, flag(overlap)) != 0 }
        }

        fn depp_put_reg_set(&self, hif: Hif, addr_data: &[u8], overlap: bool) -> bool {
            let Some(pairs) = pair_count(addr_data) else {
                return false;
            };
            unsafe { sys::DeppPutRegSet(hif, addr_data.as_ptr(), pairs, flag(overlap)) != 0 }
        }

        fn depp_get_reg_set(&self, hif: Hif, addrs: &[u8], data: &mut [u8], overlap: bool) -> bool {
            let Some(len) = reg_set_len(addrs, data) else {
                return false;
            };
            unsafe {
                sys::DeppGetRegSet(hif, addrs.as_ptr(), data.as_mut_ptr(), len, flag(overlap)) != 0
            }
        }

        fn depp_put_reg_repeat(&self, hif: Hif, addr: u8, data: &[u8], overlap: bool) -> bool {
            let len = count(data.len());
            unsafe { sys::DeppPutRegRepeat(hif, addr, data.as_ptr(), len, flag(overlap)) != 0 }
        }

        fn depp_get_reg_repeat(&self, hif: Hif, addr: u8, data: &mut [u8], overlap: bool) -> bool {
            let len = count(data.len());
            unsafe { sys::DeppGetRegRepeat(hif, addr, data.as_mut_ptr(), len, flag(overlap)) != 0 }
        }

        fn depp_set_timeout(&self, hif: Hif, requested_ns: u32, actual_ns: &mut u32) -> bool {
            unsafe { sys::DeppSetTimeout(hif, requested_ns, actual_ns) != 0 }
        }
    }
}
