//! Buffer sizes, type codes and well-known error codes shared with the Adept
//! runtime headers.

use crate::sys::{Dprp, Dtp, Hif};

pub const CCH_VERSION_MAX: usize = 256;
pub const CCH_DVC_NAME_MAX: usize = 64;
pub const CCH_CONN_MAX: usize = 261;
pub const CCH_ERC_MAX: usize = 48;
pub const CCH_ERC_MSG_MAX: usize = 128;

pub const HIF_INVALID: Hif = 0;

pub const DTP_NONE: Dtp = 0x0000;
pub const DTP_USB: Dtp = 0x0001;
pub const DTP_ETHERNET: Dtp = 0x0002;
pub const DTP_PARALLEL: Dtp = 0x0004;
pub const DTP_SERIAL: Dtp = 0x0008;

/// Port supports `DeppSetTimeout`.
pub const DPRP_EPP_SET_TIMEOUT: Dprp = 0x0000_0001;

pub const ERC_NO_ERROR: i32 = 0;
pub const ERC_CONN_REJECT: i32 = 3001;
pub const ERC_CONN_TYPE: i32 = 3002;
pub const ERC_CONN_NO_MODE: i32 = 3003;
pub const ERC_INV_PARAM: i32 = 3004;
pub const ERC_INV_CMD: i32 = 3005;
pub const ERC_UNKNOWN: i32 = 3006;
pub const ERC_NOT_IMP: i32 = 3008;
pub const ERC_TIMEOUT: i32 = 3010;
pub const ERC_CONFLICT: i32 = 3011;
pub const ERC_ALREADY_CON: i32 = 3014;
pub const ERC_NOT_CONNECTED: i32 = 3203;
pub const ERC_WRONG_MODE: i32 = 3204;
