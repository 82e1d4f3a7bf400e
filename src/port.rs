use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::backend::Backend;
use crate::error::{self, Error, Result};
use crate::interface::Interface;
use crate::sys::Hif;

/// An enabled DEPP port.
///
/// Register I/O is only reachable through this type, so it cannot happen on a
/// port that is not enabled. The port is disabled by [`Port::disable`] or,
/// failing that, when the value is dropped; either way this happens before the
/// owning [`Interface`] can be closed.
///
/// Every transfer takes an `overlap` flag that is handed to the runtime as-is:
/// `true` lets the transfer start before the previous one was acknowledged.
pub struct Port<'a, B: Backend> {
    interface: &'a mut Interface<B>,
    port: Option<u32>,
    disabled: bool,
}

impl<'a, B: Backend> Port<'a, B> {
    pub(crate) fn new(interface: &'a mut Interface<B>, port: Option<u32>) -> Self {
        Self {
            interface,
            port,
            disabled: false,
        }
    }

    /// Port number, or `None` for the default port.
    pub fn number(&self) -> Option<u32> {
        self.port
    }

    pub fn interface(&self) -> &Interface<B> {
        &*self.interface
    }

    fn hif(&self) -> Hif {
        self.interface.handle()
    }

    fn backend(&self) -> &B {
        self.interface.backend()
    }

    pub fn put_reg(&self, addr: u8, data: u8, overlap: bool) -> Result<()> {
        trace!(addr, data, overlap, "put register");
        let ok = self.backend().depp_put_reg(self.hif(), addr, data, overlap);
        error::check(self.backend(), "DeppPutReg", ok)
    }

    pub fn get_reg(&self, addr: u8, overlap: bool) -> Result<u8> {
        let mut data = 0u8;
        let ok = self.backend().depp_get_reg(self.hif(), addr, &mut data, overlap);
        error::check(self.backend(), "DeppGetReg", ok)?;
        trace!(addr, data, overlap, "got register");
        Ok(data)
    }

    /// Writes each `(address, data)` pair in order. Addresses may repeat.
    pub fn put_reg_set(&self, pairs: &[(u8, u8)], overlap: bool) -> Result<()> {
        ensure_native_count(pairs.len())?;
        let addr_data: Vec<u8> = pairs.iter().flat_map(|&(addr, data)| [addr, data]).collect();
        let ok = self.backend().depp_put_reg_set(self.hif(), &addr_data, overlap);
        error::check(self.backend(), "DeppPutRegSet", ok)
    }

    /// Reads one byte per entry of `addrs`, in order. Addresses may repeat.
    pub fn get_reg_set(&self, addrs: &[u8], overlap: bool) -> Result<Vec<u8>> {
        let mut data = vec![0u8; addrs.len()];
        self.get_reg_set_into(addrs, &mut data, overlap)?;
        Ok(data)
    }

    pub fn get_reg_set_into(&self, addrs: &[u8], data: &mut [u8], overlap: bool) -> Result<()> {
        if addrs.len() != data.len() {
            return Err(Error::LengthMismatch {
                addresses: addrs.len(),
                data: data.len(),
            });
        }
        ensure_native_count(data.len())?;
        let ok = self.backend().depp_get_reg_set(self.hif(), addrs, data, overlap);
        error::check(self.backend(), "DeppGetRegSet", ok)
    }

    /// Streams `data` into the single register `addr`.
    pub fn put_reg_repeat(&self, addr: u8, data: &[u8], overlap: bool) -> Result<()> {
        ensure_native_count(data.len())?;
        let ok = self.backend().depp_put_reg_repeat(self.hif(), addr, data, overlap);
        error::check(self.backend(), "DeppPutRegRepeat", ok)
    }

    /// Streams `count` bytes out of the single register `addr`.
    pub fn get_reg_repeat(&self, addr: u8, count: usize, overlap: bool) -> Result<Vec<u8>> {
        let mut data = vec![0u8; count];
        self.get_reg_repeat_into(addr, &mut data, overlap)?;
        Ok(data)
    }

    pub fn get_reg_repeat_into(&self, addr: u8, data: &mut [u8], overlap: bool) -> Result<()> {
        ensure_native_count(data.len())?;
        let ok = self.backend().depp_get_reg_repeat(self.hif(), addr, data, overlap);
        error::check(self.backend(), "DeppGetRegRepeat", ok)
    }

    /// Requests a transaction timeout and returns the value the runtime
    /// actually applied: the nearest supported value not above the request,
    /// or the largest supported value.
    pub fn set_timeout(&self, requested_ns: u32) -> Result<u32> {
        let mut actual_ns = 0u32;
        let ok = self
            .backend()
            .depp_set_timeout(self.hif(), requested_ns, &mut actual_ns);
        error::check(self.backend(), "DeppSetTimeout", ok)?;
        debug!(requested_ns, actual_ns, "set transaction timeout");
        Ok(actual_ns)
    }

    /// [`Port::set_timeout`] for durations; anything longer than the native
    /// range is requested as the maximum.
    pub fn set_timeout_duration(&self, timeout: Duration) -> Result<Duration> {
        let requested_ns = u32::try_from(timeout.as_nanos()).unwrap_or(u32::MAX);
        let actual_ns = self.set_timeout(requested_ns)?;
        Ok(Duration::from_nanos(u64::from(actual_ns)))
    }

    pub fn disable(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.disabled {
            return Ok(());
        }
        self.disabled = true;
        let ok = self.backend().depp_disable(self.hif());
        error::check(self.backend(), "DeppDisable", ok)?;
        debug!(hif = self.hif(), "disabled port");
        Ok(())
    }
}

impl<B: Backend> Drop for Port<'_, B> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(hif = self.hif(), %err, "failed to disable port on drop");
        }
    }
}

fn ensure_native_count(len: usize) -> Result<()> {
    match u32::try_from(len) {
        Ok(_) => Ok(()),
        Err(_) => Err(Error::TransferTooLarge { len }),
    }
}
