//! # adept-depp
//!
//! Rust bindings for the Digilent Adept runtime: the DMGR device manager and
//! the DEPP asynchronous parallel register interface. [`Manager`] enumerates
//! and opens devices, [`Interface`] owns an open handle, and [`Port`] performs
//! register I/O on an enabled DEPP port. The following example reads one
//! register from a Cmod S6:
//!
//! ```no_run
//! # #[cfg(feature = "runtime")]
//! # fn main() -> adept_depp::Result<()> {
//! use adept_depp::Manager;
//!
//! let manager = Manager::runtime();
//! println!("DMGR {}", manager.version()?);
//!
//! let mut interface = manager.open("CmodS6")?;
//! let port = interface.enable()?;
//! let value = port.get_reg(5, false)?;
//! println!("register 5 = {value:#04x}");
//!
//! // Ports are disabled before their interface is closed.
//! port.disable()?;
//! interface.close()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "runtime"))]
//! # fn main() {}
//! ```
//!
//! The native entry points are only linked with the `runtime` feature. The
//! default `sim` feature provides [`sim::Simulator`], an in-process backend
//! used by the tests.
pub mod backend;
pub mod constants;
pub mod probe;
#[cfg(feature = "sim")]
pub mod sim;
pub mod sys;

mod device;
mod error;
mod interface;
mod port;
mod properties;

pub use backend::Backend;
#[cfg(feature = "runtime")]
pub use backend::Runtime;
pub use device::{DeviceInfo, Manager, Transport};
pub use error::{Error, ErrorCode, ErrorDescription, Result};
pub use interface::Interface;
pub use port::Port;
pub use properties::PortProperties;
