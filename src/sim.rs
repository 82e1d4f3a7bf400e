//! In-process stand-in for the Adept runtime.
//!
//! [`Simulator`] implements [`Backend`] over a fixed set of [`SimDevice`]s with
//! 256 byte-wide registers each. It follows the runtime's observable rules:
//! failures leave a per-thread error code that is cleared when read,
//! enumeration is a shared snapshot, a handle can only be opened once, register
//! I/O needs an enabled port, and timeouts are clamped to supported values. It
//! also keeps an ordered log of the entry points called and counts handles
//! closed while a port was still enabled, without correcting them.

use std::collections::HashMap;
use std::ffi::CStr;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::backend::Backend;
use crate::constants::{
    CCH_CONN_MAX, CCH_DVC_NAME_MAX, CCH_ERC_MAX, CCH_ERC_MSG_MAX, CCH_VERSION_MAX,
    DPRP_EPP_SET_TIMEOUT, ERC_ALREADY_CON, ERC_CONFLICT, ERC_CONN_REJECT, ERC_INV_CMD,
    ERC_INV_PARAM, ERC_NO_ERROR, ERC_NOT_CONNECTED, ERC_NOT_IMP, ERC_WRONG_MODE,
};
use crate::device::Transport;
use crate::sys::{Dprp, Dvc, Erc, Hif};

pub const SIM_VERSION: &str = "2.27.9-sim";
/// Granularity of the simulated transaction timeout.
pub const TIMEOUT_STEP_NS: u32 = 500;
pub const TIMEOUT_MAX_NS: u32 = 320_000;

const ERROR_TABLE: &[(Erc, &str, &str)] = &[
    (ERC_NO_ERROR, "ercNoError", "No error occurred"),
    (ERC_CONN_REJECT, "ercConnReject", "Connection rejected: no matching device"),
    (ERC_INV_PARAM, "ercInvParam", "Invalid parameter sent in API call"),
    (ERC_INV_CMD, "ercInvCmd", "Command not valid in the current state"),
    (ERC_NOT_IMP, "ercNotImp", "API function not implemented by the port"),
    (ERC_CONFLICT, "ercConflict", "Port is already enabled"),
    (ERC_ALREADY_CON, "ercAlreadyCon", "Device is already open"),
    (ERC_NOT_CONNECTED, "ercNotConnected", "Interface handle is not open"),
    (ERC_WRONG_MODE, "ercWrongMode", "No port is enabled on the interface"),
];

/// A simulated board.
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub name: String,
    pub connection: String,
    pub transport: Transport,
    /// Property bits of each DEPP port; the length is the port count.
    pub ports: Vec<Dprp>,
    registers: [u8; 256],
}

impl SimDevice {
    pub fn new(name: &str, connection: &str, transport: Transport) -> Self {
        Self {
            name: name.to_owned(),
            connection: connection.to_owned(),
            transport,
            ports: vec![DPRP_EPP_SET_TIMEOUT],
            registers: [0; 256],
        }
    }

    pub fn with_ports(mut self, ports: Vec<Dprp>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_register(mut self, addr: u8, value: u8) -> Self {
        self.registers[usize::from(addr)] = value;
        self
    }

    fn matches(&self, selector: &str) -> bool {
        self.connection == selector || self.name.eq_ignore_ascii_case(selector)
    }
}

#[derive(Debug)]
struct Session {
    device: usize,
    enabled: Option<usize>,
    timeout_ns: u32,
}

#[derive(Debug, Default)]
struct State {
    devices: Vec<SimDevice>,
    snapshot: Option<Vec<usize>>,
    sessions: HashMap<Hif, Session>,
    next_hif: Hif,
    calls: Vec<&'static str>,
    transfers: Vec<(&'static str, bool)>,
    close_while_enabled: usize,
}

type Outcome<T> = std::result::Result<T, Erc>;

impl State {
    fn session(&self, hif: Hif) -> Outcome<&Session> {
        self.sessions.get(&hif).ok_or(ERC_NOT_CONNECTED)
    }

    /// Device behind `hif`, provided a port is enabled on it.
    fn enabled_device(&mut self, hif: Hif) -> Outcome<&mut SimDevice> {
        let session = self.session(hif)?;
        if session.enabled.is_none() {
            return Err(ERC_WRONG_MODE);
        }
        let index = session.device;
        Ok(&mut self.devices[index])
    }
}

#[derive(Debug, Default)]
pub struct Simulator {
    state: Mutex<State>,
    errors: Mutex<HashMap<ThreadId, Erc>>,
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(self, device: SimDevice) -> Self {
        self.state.lock().devices.push(device);
        self
    }

    /// Entry points called so far, oldest first.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.transfers.clear();
    }

    /// Register transfers so far with the overlap flag each one received.
    pub fn transfers(&self) -> Vec<(&'static str, bool)> {
        self.state.lock().transfers.clone()
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Handles closed while a port on them was still enabled.
    pub fn close_while_enabled(&self) -> usize {
        self.state.lock().close_while_enabled
    }

    /// Timeout currently applied to `hif`, if the handle is open.
    pub fn timeout_ns(&self, hif: Hif) -> Option<u32> {
        self.state.lock().sessions.get(&hif).map(|session| session.timeout_ns)
    }

    pub fn is_enabled(&self, hif: Hif) -> bool {
        self.state
            .lock()
            .sessions
            .get(&hif)
            .is_some_and(|session| session.enabled.is_some())
    }

    /// Runs `op` under the state lock and logs the call. A failure leaves its
    /// code in the calling thread's error slot; a success clears the slot.
    fn call<T>(&self, name: &'static str, op: impl FnOnce(&mut State) -> Outcome<T>) -> Outcome<T> {
        let outcome = {
            let mut state = self.state.lock();
            state.calls.push(name);
            op(&mut *state)
        };
        let thread = thread::current().id();
        match outcome {
            Ok(_) => {
                self.errors.lock().remove(&thread);
            }
            Err(erc) => {
                self.errors.lock().insert(thread, erc);
            }
        }
        outcome
    }

    fn flag(&self, name: &'static str, op: impl FnOnce(&mut State) -> Outcome<()>) -> bool {
        self.call(name, op).is_ok()
    }

    fn transfer(
        &self,
        name: &'static str,
        overlap: bool,
        op: impl FnOnce(&mut State) -> Outcome<()>,
    ) -> bool {
        self.flag(name, |state| {
            state.transfers.push((name, overlap));
            op(state)
        })
    }
}

fn write_str(buffer: &mut [u8], text: &str) {
    let len = text.len().min(buffer.len().saturating_sub(1));
    buffer[..len].copy_from_slice(&text.as_bytes()[..len]);
    if let Some(terminator) = buffer.get_mut(len) {
        *terminator = 0;
    }
}

fn write_chars(buffer: &mut [std::os::raw::c_char], text: &str) {
    let mut bytes = vec![0u8; buffer.len()];
    write_str(&mut bytes, text);
    for (slot, byte) in buffer.iter_mut().zip(bytes) {
        *slot = byte as std::os::raw::c_char;
    }
}

fn enable(state: &mut State, hif: Hif, port: i32) -> Outcome<()> {
    let device = state.session(hif)?.device;
    let port = usize::try_from(port).map_err(|_| ERC_INV_PARAM)?;
    if port >= state.devices[device].ports.len() {
        return Err(ERC_INV_PARAM);
    }
    let session = state.sessions.get_mut(&hif).ok_or(ERC_NOT_CONNECTED)?;
    if session.enabled.is_some() {
        return Err(ERC_CONFLICT);
    }
    session.enabled = Some(port);
    Ok(())
}

fn clamp_timeout(requested_ns: u32) -> u32 {
    requested_ns.min(TIMEOUT_MAX_NS) / TIMEOUT_STEP_NS * TIMEOUT_STEP_NS
}

impl Backend for Simulator {
    fn dmgr_get_version(&self, version: &mut [u8; CCH_VERSION_MAX]) -> bool {
        self.flag("DmgrGetVersion", |_| {
            write_str(version, SIM_VERSION);
            Ok(())
        })
    }

    fn dmgr_get_last_error(&self) -> Erc {
        self.state.lock().calls.push("DmgrGetLastError");
        self.errors
            .lock()
            .remove(&thread::current().id())
            .unwrap_or(ERC_NO_ERROR)
    }

    fn dmgr_sz_from_erc(
        &self,
        erc: Erc,
        name: &mut [u8; CCH_ERC_MAX],
        message: &mut [u8; CCH_ERC_MSG_MAX],
    ) -> bool {
        self.state.lock().calls.push("DmgrSzFromErc");
        let (symbol, text) = ERROR_TABLE
            .iter()
            .find(|(code, _, _)| *code == erc)
            .map(|(_, symbol, text)| (*symbol, *text))
            .unwrap_or(("ercUnknown", "Unrecognised error code"));
        write_str(name, symbol);
        write_str(message, text);
        true
    }

    fn dmgr_enum_devices(&self, count: &mut i32) -> bool {
        self.flag("DmgrEnumDevices", |state| {
            let snapshot: Vec<usize> = (0..state.devices.len()).collect();
            *count = i32::try_from(snapshot.len()).map_err(|_| ERC_INV_PARAM)?;
            state.snapshot = Some(snapshot);
            Ok(())
        })
    }

    fn dmgr_get_dvc(&self, index: i32, dvc: &mut Dvc) -> bool {
        self.flag("DmgrGetDvc", |state| {
            let snapshot = state.snapshot.as_ref().ok_or(ERC_INV_CMD)?;
            let slot = usize::try_from(index).map_err(|_| ERC_INV_PARAM)?;
            let device = snapshot
                .get(slot)
                .map(|&device| &state.devices[device])
                .ok_or(ERC_INV_PARAM)?;
            *dvc = Dvc::default();
            write_chars(&mut dvc.sz_name[..CCH_DVC_NAME_MAX], &device.name);
            write_chars(&mut dvc.sz_conn[..CCH_CONN_MAX], &device.connection);
            dvc.dtp = device.transport.raw();
            Ok(())
        })
    }

    fn dmgr_free_dvc_enum(&self) -> bool {
        self.flag("DmgrFreeDvcEnum", |state| {
            state.snapshot = None;
            Ok(())
        })
    }

    fn dmgr_open(&self, hif: &mut Hif, selector: &CStr) -> bool {
        self.flag("DmgrOpen", |state| {
            let selector = selector.to_str().map_err(|_| ERC_INV_PARAM)?;
            let device = state
                .devices
                .iter()
                .position(|device| device.matches(selector))
                .ok_or(ERC_CONN_REJECT)?;
            if state.sessions.values().any(|session| session.device == device) {
                return Err(ERC_ALREADY_CON);
            }
            state.next_hif += 1;
            let opened = state.next_hif;
            state.sessions.insert(
                opened,
                Session {
                    device,
                    enabled: None,
                    timeout_ns: TIMEOUT_MAX_NS,
                },
            );
            *hif = opened;
            Ok(())
        })
    }

    fn dmgr_close(&self, hif: Hif) -> bool {
        self.flag("DmgrClose", |state| {
            let session = state.sessions.remove(&hif).ok_or(ERC_NOT_CONNECTED)?;
            if session.enabled.is_some() {
                state.close_while_enabled += 1;
            }
            Ok(())
        })
    }

    fn depp_get_version(&self, version: &mut [u8; CCH_VERSION_MAX]) -> bool {
        self.flag("DeppGetVersion", |_| {
            write_str(version, SIM_VERSION);
            Ok(())
        })
    }

    fn depp_get_port_count(&self, hif: Hif, count: &mut i32) -> bool {
        self.flag("DeppGetPortCount", |state| {
            let device = state.session(hif)?.device;
            *count = i32::try_from(state.devices[device].ports.len()).map_err(|_| ERC_INV_PARAM)?;
            Ok(())
        })
    }

    fn depp_get_port_properties(&self, hif: Hif, port: i32, properties: &mut Dprp) -> bool {
        self.flag("DeppGetPortProperties", |state| {
            let device = state.session(hif)?.device;
            let port = usize::try_from(port).map_err(|_| ERC_INV_PARAM)?;
            *properties = *state.devices[device].ports.get(port).ok_or(ERC_INV_PARAM)?;
            Ok(())
        })
    }

    fn depp_enable(&self, hif: Hif) -> bool {
        self.flag("DeppEnable", |state| enable(state, hif, 0))
    }

    fn depp_enable_ex(&self, hif: Hif, port: i32) -> bool {
        self.flag("DeppEnableEx", |state| enable(state, hif, port))
    }

    fn depp_disable(&self, hif: Hif) -> bool {
        self.flag("DeppDisable", |state| {
            let session = state.sessions.get_mut(&hif).ok_or(ERC_NOT_CONNECTED)?;
            session.enabled.take().ok_or(ERC_WRONG_MODE)?;
            Ok(())
        })
    }

    fn depp_put_reg(&self, hif: Hif, addr: u8, data: u8, overlap: bool) -> bool {
        self.transfer("DeppPutReg", overlap, |state| {
            state.enabled_device(hif)?.registers[usize::from(addr)] = data;
            Ok(())
        })
    }

    fn depp_get_reg(&self, hif: Hif, addr: u8, data: &mut u8, overlap: bool) -> bool {
        self.transfer("DeppGetReg", overlap, |state| {
            *data = state.enabled_device(hif)?.registers[usize::from(addr)];
            Ok(())
        })
    }

    fn depp_put_reg_set(&self, hif: Hif, addr_data: &[u8], overlap: bool) -> bool {
        self.transfer("DeppPutRegSet", overlap, |state| {
            if addr_data.len() % 2 != 0 {
                return Err(ERC_INV_PARAM);
            }
            let device = state.enabled_device(hif)?;
            for pair in addr_data.chunks_exact(2) {
                device.registers[usize::from(pair[0])] = pair[1];
            }
            Ok(())
        })
    }

    fn depp_get_reg_set(&self, hif: Hif, addrs: &[u8], data: &mut [u8], overlap: bool) -> bool {
        self.transfer("DeppGetRegSet", overlap, |state| {
            if addrs.len() != data.len() {
                return Err(ERC_INV_PARAM);
            }
            let device = state.enabled_device(hif)?;
            for (slot, &addr) in data.iter_mut().zip(addrs) {
                *slot = device.registers[usize::from(addr)];
            }
            Ok(())
        })
    }

    fn depp_put_reg_repeat(&self, hif: Hif, addr: u8, data: &[u8], overlap: bool) -> bool {
        self.transfer("DeppPutRegRepeat", overlap, |state| {
            let device = state.enabled_device(hif)?;
            for &byte in data {
                device.registers[usize::from(addr)] = byte;
            }
            Ok(())
        })
    }

    fn depp_get_reg_repeat(&self, hif: Hif, addr: u8, data: &mut [u8], overlap: bool) -> bool {
        self.transfer("DeppGetRegRepeat", overlap, |state| {
            let value = state.enabled_device(hif)?.registers[usize::from(addr)];
            data.fill(value);
            Ok(())
        })
    }

    fn depp_set_timeout(&self, hif: Hif, requested_ns: u32, actual_ns: &mut u32) -> bool {
        self.flag("DeppSetTimeout", |state| {
            let session = state.session(hif)?;
            let port = session.enabled.ok_or(ERC_WRONG_MODE)?;
            let supported = state.devices[session.device].ports[port] & DPRP_EPP_SET_TIMEOUT != 0;
            if !supported {
                return Err(ERC_NOT_IMP);
            }
            let applied = clamp_timeout(requested_ns);
            if let Some(session) = state.sessions.get_mut(&hif) {
                session.timeout_ns = applied;
            }
            *actual_ns = applied;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped_down_to_a_step() {
        assert_eq!(clamp_timeout(0), 0);
        assert_eq!(clamp_timeout(499), 0);
        assert_eq!(clamp_timeout(1_250), 1_000);
        assert_eq!(clamp_timeout(u32::MAX), TIMEOUT_MAX_NS);
    }

    #[test]
    fn strings_are_truncated_and_terminated() {
        let mut buffer = [0xffu8; 4];
        write_str(&mut buffer, "abcdef");
        assert_eq!(&buffer, b"abc\0");
    }

    #[test]
    fn error_slot_is_per_thread() {
        let sim = Simulator::new();
        let mut data = 0;
        assert!(!sim.depp_get_reg(7, 0, &mut data, false));

        let other = std::thread::scope(|scope| scope.spawn(|| sim.dmgr_get_last_error()).join());
        assert_eq!(other.ok(), Some(ERC_NO_ERROR));
        assert_eq!(sim.dmgr_get_last_error(), ERC_NOT_CONNECTED);
    }
}
