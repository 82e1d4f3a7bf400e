use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::{self, Result};
use crate::port::Port;
use crate::properties::PortProperties;
use crate::sys::Hif;

/// An open interface handle.
///
/// The handle is released exactly once: by [`Interface::close`] or, failing
/// that, when the value is dropped. It may move between threads but cannot be
/// shared by them, and it cannot be closed while a [`Port`] borrowed from it
/// is still enabled.
pub struct Interface<B: Backend> {
    backend: Arc<B>,
    hif: Hif,
    selector: String,
    closed: bool,
    _not_sync: PhantomData<Cell<()>>,
}

impl<B: Backend> Interface<B> {
    pub(crate) fn new(backend: Arc<B>, hif: Hif, selector: &str) -> Self {
        Self {
            backend,
            hif,
            selector: selector.to_owned(),
            closed: false,
            _not_sync: PhantomData,
        }
    }

    pub fn handle(&self) -> Hif {
        self.hif
    }

    /// Selector the interface was opened with.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of DEPP ports the device offers.
    pub fn port_count(&self) -> Result<usize> {
        let mut count = 0i32;
        let ok = self.backend.depp_get_port_count(self.hif, &mut count);
        error::check(&*self.backend, "DeppGetPortCount", ok)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn port_properties(&self, port: u32) -> Result<PortProperties> {
        let mut bits = 0;
        let port = i32::try_from(port).unwrap_or(i32::MAX);
        let ok = self
            .backend
            .depp_get_port_properties(self.hif, port, &mut bits);
        error::check(&*self.backend, "DeppGetPortProperties", ok)?;
        Ok(PortProperties::from_bits(bits))
    }

    /// Enables the default port (port 0).
    pub fn enable(&mut self) -> Result<Port<'_, B>> {
        let ok = self.backend.depp_enable(self.hif);
        error::check(&*self.backend, "DeppEnable", ok)?;
        debug!(hif = self.hif, "enabled default port");
        Ok(Port::new(self, None))
    }

    pub fn enable_port(&mut self, port: u32) -> Result<Port<'_, B>> {
        let raw_port = i32::try_from(port).unwrap_or(i32::MAX);
        let ok = self.backend.depp_enable_ex(self.hif, raw_port);
        error::check(&*self.backend, "DeppEnableEx", ok)?;
        debug!(hif = self.hif, port, "enabled port");
        Ok(Port::new(self, Some(port)))
    }

    /// Releases the handle. The handle is gone afterwards even when the
    /// runtime reports a failure.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let ok = self.backend.dmgr_close(self.hif);
        error::check(&*self.backend, "DmgrClose", ok)?;
        info!(hif = self.hif, selector = %self.selector, "closed interface");
        Ok(())
    }
}

impl<B: Backend> Drop for Interface<B> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(hif = self.hif, %err, "failed to close interface on drop");
        }
    }
}
