//! Raw declarations of the DMGR and DEPP entry points.
//!
//! Everything here mirrors the vendor C headers: `BOOL` is a 32-bit integer,
//! strings are caller-allocated NUL-terminated byte buffers, and counts are the
//! exact element counts of the buffers passed alongside them. The functions are
//! only declared when the `runtime` feature links the vendor libraries.

use std::os::raw::c_char;

use crate::constants::{CCH_CONN_MAX, CCH_DVC_NAME_MAX};

pub type Bool = i32;
pub type Hif = u32;
pub type Erc = i32;
pub type Dtp = u32;
pub type Dprp = u32;

/// `DVC` record filled in by `DmgrGetDvc`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Dvc {
    pub sz_name: [c_char; CCH_DVC_NAME_MAX],
    pub sz_conn: [c_char; CCH_CONN_MAX],
    pub dtp: Dtp,
}

impl Default for Dvc {
    fn default() -> Self {
        Self {
            sz_name: [0; CCH_DVC_NAME_MAX],
            sz_conn: [0; CCH_CONN_MAX],
            dtp: 0,
        }
    }
}

const _: () = {
    assert!(std::mem::offset_of!(Dvc, sz_name) == 0);
    assert!(std::mem::offset_of!(Dvc, sz_conn) == 64);
    assert!(std::mem::offset_of!(Dvc, dtp) == 328);
    assert!(std::mem::size_of::<Dvc>() == 332);
};

#[cfg(feature = "runtime")]
#[link(name = "dmgr")]
unsafe extern "C" {
    pub fn DmgrGetVersion(sz_version: *mut c_char) -> Bool;
    pub fn DmgrGetLastError() -> Erc;
    pub fn DmgrSzFromErc(erc: Erc, sz_erc: *mut c_char, sz_erc_message: *mut c_char) -> Bool;
    pub fn DmgrEnumDevices(pcdvc: *mut i32) -> Bool;
    pub fn DmgrGetDvc(idvc: i32, pdvc: *mut Dvc) -> Bool;
    pub fn DmgrFreeDvcEnum() -> Bool;
    pub fn DmgrOpen(phif: *mut Hif, sz_sel: *const c_char) -> Bool;
    pub fn DmgrClose(hif: Hif) -> Bool;
}

#[cfg(feature = "runtime")]
#[link(name = "depp")]
unsafe extern "C" {
    pub fn DeppGetVersion(sz_version: *mut c_char) -> Bool;
    pub fn DeppGetPortCount(hif: Hif, pcprt: *mut i32) -> Bool;
    pub fn DeppGetPortProperties(hif: Hif, prt_req: i32, pdprp: *mut Dprp) -> Bool;
    pub fn DeppEnable(hif: Hif) -> Bool;
    pub fn DeppEnableEx(hif: Hif, prt_req: i32) -> Bool;
    pub fn DeppDisable(hif: Hif) -> Bool;
    pub fn DeppPutReg(hif: Hif, b_addr: u8, b_data: u8, f_overlap: Bool) -> Bool;
    pub fn DeppGetReg(hif: Hif, b_addr: u8, pb_data: *mut u8, f_overlap: Bool) -> Bool;
    pub fn DeppPutRegSet(
        hif: Hif,
        pb_addr_data: *const u8,
        n_addr_data_pairs: u32,
        f_overlap: Bool,
    ) -> Bool;
    pub fn DeppGetRegSet(
        hif: Hif,
        pb_addr: *const u8,
        pb_data: *mut u8,
        cb_data: u32,
        f_overlap: Bool,
    ) -> Bool;
    pub fn DeppPutRegRepeat(
        hif: Hif,
        b_addr: u8,
        pb_data: *const u8,
        cb_data: u32,
        f_overlap: Bool,
    ) -> Bool;
    pub fn DeppGetRegRepeat(
        hif: Hif,
        b_addr: u8,
        pb_data: *mut u8,
        cb_data: u32,
        f_overlap: Bool,
    ) -> Bool;
    pub fn DeppSetTimeout(hif: Hif, tns_timeout_try: u32, ptns_timeout: *mut u32) -> Bool;
}
