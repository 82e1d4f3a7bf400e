use tracing::info;

use crate::backend::Backend;
use crate::device::{DeviceInfo, Manager};
use crate::error::Result;
use crate::properties::PortProperties;

/// What [`run`] should exercise.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub selector: String,
    pub register: u8,
    pub timeout_ns: Option<u32>,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            selector: String::from("CmodS6"),
            register: 5,
            timeout_ns: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub manager_version: String,
    pub transport_version: String,
    pub devices: Vec<DeviceInfo>,
    pub port_count: usize,
    pub properties: PortProperties,
    pub timeout_ns: Option<u32>,
    pub register: u8,
    pub value: u8,
}

/// Connectivity check: versions, enumeration, open, enable the default port,
/// optionally set a timeout, read one register, then disable and close.
pub fn run<B: Backend>(manager: &Manager<B>, options: &ProbeOptions) -> Result<ProbeReport> {
    let manager_version = manager.version()?;
    let transport_version = manager.transport_version()?;
    info!(%manager_version, %transport_version, "adept runtime");

    let devices = manager.devices()?;
    for (index, device) in devices.iter().enumerate() {
        info!(
            index,
            name = %device.name,
            connection = %device.connection,
            transport = %device.transport,
            "found device"
        );
    }

    let mut interface = manager.open(&options.selector)?;
    let port_count = interface.port_count()?;
    let properties = interface.port_properties(0)?;
    info!(port_count, properties = properties.bits(), "port information");

    let port = interface.enable()?;
    let timeout_ns = match options.timeout_ns {
        Some(requested) => Some(port.set_timeout(requested)?),
        None => None,
    };
    let value = port.get_reg(options.register, false)?;
    info!(register = options.register, value, "read register");
    port.disable()?;
    interface.close()?;

    Ok(ProbeReport {
        manager_version,
        transport_version,
        devices,
        port_count,
        properties,
        timeout_ns,
        register: options.register,
        value,
    })
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::device::Transport;
    use crate::error::Error;
    use crate::sim::{SimDevice, Simulator};

    fn manager() -> Manager<Simulator> {
        let board =
            SimDevice::new("CmodS6", "SN:210328A1B2C3", Transport::Usb).with_register(5, 0xa5);
        Manager::new(Simulator::new().with_device(board))
    }

    #[test]
    fn probe_reads_register_and_releases_handle() {
        let manager = manager();
        let options = ProbeOptions {
            timeout_ns: Some(10_250),
            ..ProbeOptions::default()
        };
        let report = run(&manager, &options).expect("probe failed");

        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.port_count, 1);
        assert!(report.properties.supports_set_timeout());
        assert_eq!(report.timeout_ns, Some(10_000));
        assert_eq!(report.value, 0xa5);
        assert_eq!(manager.backend().open_handles(), 0);
        assert_eq!(manager.last_error(), crate::ErrorCode::NONE);
    }

    #[test]
    fn probe_with_unknown_selector_reports_runtime_error() {
        let manager = manager();
        let options = ProbeOptions {
            selector: String::from("Nexys4"),
            ..ProbeOptions::default()
        };
        let err = run(&manager, &options).expect_err("probe should fail");
        assert!(matches!(err, Error::Adept { call: "DmgrOpen", .. }));
        assert_eq!(manager.backend().open_handles(), 0);
    }
}
