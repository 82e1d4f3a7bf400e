#![cfg(feature = "sim")]

use adept_depp::backend::Backend;
use adept_depp::constants::{
    DPRP_EPP_SET_TIMEOUT, ERC_ALREADY_CON, ERC_INV_PARAM, ERC_NOT_CONNECTED, ERC_NOT_IMP,
};
use adept_depp::sim::{SimDevice, Simulator, TIMEOUT_MAX_NS};
use adept_depp::{Error, ErrorCode, Interface, Manager, Transport};

fn cmod() -> SimDevice {
    SimDevice::new("CmodS6", "SN:210328A1B2C3", Transport::Usb)
}

fn manager() -> Manager<Simulator> {
    Manager::new(
        Simulator::new()
            .with_device(cmod())
            .with_device(SimDevice::new("Basys2", "SN:100412D4E5F6", Transport::Usb))
            .with_device(
                SimDevice::new("NetFPGA", "192.168.1.20", Transport::Ethernet)
                    .with_ports(vec![DPRP_EPP_SET_TIMEOUT, 0]),
            ),
    )
}

fn adept_code(err: &Error) -> i32 {
    err.code().map(ErrorCode::raw).unwrap_or_default()
}

#[test]
fn open_enable_disable_close_leaves_no_error() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let port = interface.enable().expect("enable failed");
    port.disable().expect("disable failed");
    interface.close().expect("close failed");

    assert_eq!(manager.last_error(), ErrorCode::NONE);
    assert_eq!(manager.backend().open_handles(), 0);
}

#[test]
fn last_error_is_consumed_by_the_first_read() {
    let manager = manager();
    manager.version().expect("version failed");
    assert_eq!(manager.last_error(), ErrorCode::NONE);

    let mut data = 0;
    assert!(!manager.backend().depp_get_reg(42, 5, &mut data, false));
    let code = manager.last_error();
    assert_eq!(code, ErrorCode(ERC_NOT_CONNECTED));
    assert_eq!(manager.last_error(), ErrorCode::NONE);

    let description = manager.describe(code).expect("describe failed");
    assert_eq!(description.name, "ercNotConnected");
    assert!(!description.message.is_empty());
}

#[test]
fn success_after_a_failure_reports_no_error() {
    let manager = manager();
    let mut data = 0;
    assert!(!manager.backend().depp_get_reg(42, 5, &mut data, false));

    manager.version().expect("version failed");
    assert_eq!(manager.last_error(), ErrorCode::NONE);
}

#[test]
fn overlap_flag_reaches_the_runtime_unchanged() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let port = interface.enable().expect("enable failed");
    manager.backend().clear_calls();

    for overlap in [true, false] {
        port.put_reg(5, 0x42, overlap).expect("put_reg failed");
        port.put_reg_set(&[(5, 0x43)], overlap).expect("put_reg_set failed");
        port.get_reg(5, overlap).expect("get_reg failed");
        port.get_reg_set(&[5, 5], overlap).expect("get_reg_set failed");
        port.put_reg_repeat(5, &[1, 2], overlap).expect("put_reg_repeat failed");
        port.get_reg_repeat(5, 2, overlap).expect("get_reg_repeat failed");
    }

    let names = [
        "DeppPutReg",
        "DeppPutRegSet",
        "DeppGetReg",
        "DeppGetRegSet",
        "DeppPutRegRepeat",
        "DeppGetRegRepeat",
    ];
    let expected: Vec<_> = [true, false]
        .into_iter()
        .flat_map(|overlap| names.map(|name| (name, overlap)))
        .collect();
    assert_eq!(manager.backend().transfers(), expected);
}

#[test]
fn device_lookup_is_bounded_by_the_enumeration() {
    let manager = manager();
    let count = manager.enumerate().expect("enumerate failed");
    assert_eq!(count, 3);

    for index in 0..count {
        manager.device(index).expect("lookup inside the enumeration failed");
    }
    for index in [count, count + 1] {
        let err = manager.device(index).expect_err("lookup past the enumeration succeeded");
        assert_eq!(adept_code(&err), ERC_INV_PARAM);
    }

    let third = manager.device(2).expect("lookup failed");
    assert_eq!(third.connection, "192.168.1.20");
    assert_eq!(third.transport, Transport::Ethernet);
}

#[test]
fn devices_frees_the_enumeration() {
    let manager = manager();
    let devices = manager.devices().expect("devices failed");
    let names: Vec<_> = devices.iter().map(|device| device.name.as_str()).collect();
    assert_eq!(names, ["CmodS6", "Basys2", "NetFPGA"]);

    assert!(manager.device(0).is_err());
    assert!(manager.backend().calls().contains(&"DmgrFreeDvcEnum"));
}

#[test]
fn repeated_addresses_are_written_in_order() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let port = interface.enable().expect("enable failed");

    port.put_reg_set(&[(5, 0x01), (5, 0x02)], false).expect("put_reg_set failed");
    assert_eq!(port.get_reg(5, false).expect("get_reg failed"), 0x02);

    port.put_reg_set(&[(1, 0x10), (2, 0x20)], true).expect("put_reg_set failed");
    let data = port.get_reg_set(&[2, 1, 2, 5], true).expect("get_reg_set failed");
    assert_eq!(data, [0x20, 0x10, 0x20, 0x02]);
}

#[test]
fn mismatched_register_set_is_rejected_before_the_runtime() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let port = interface.enable().expect("enable failed");
    manager.backend().clear_calls();

    let mut data = [0u8; 2];
    let err = port
        .get_reg_set_into(&[1, 2, 3], &mut data, false)
        .expect_err("mismatched buffers accepted");
    assert!(matches!(err, Error::LengthMismatch { addresses: 3, data: 2 }));
    assert!(manager.backend().calls().is_empty());
}

#[test]
fn streamed_transfers_use_a_single_register() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let port = interface.enable().expect("enable failed");

    port.put_reg_repeat(9, &[0x11, 0x22, 0x33], false).expect("put_reg_repeat failed");
    let data = port.get_reg_repeat(9, 4, false).expect("get_reg_repeat failed");
    assert_eq!(data, [0x33; 4]);
    assert_eq!(port.get_reg(8, false).expect("get_reg failed"), 0);
}

#[test]
fn timeout_never_exceeds_the_request() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let hif = interface.handle();
    let port = interface.enable().expect("enable failed");

    for requested in [0, 1, 499, 500, 12_345, 250_000, TIMEOUT_MAX_NS, u32::MAX] {
        let actual = port.set_timeout(requested).expect("set_timeout failed");
        assert!(actual <= requested, "{actual} > {requested}");
        assert!(actual <= TIMEOUT_MAX_NS);
        assert_eq!(manager.backend().timeout_ns(hif), Some(actual));
    }
    assert_eq!(port.set_timeout(u32::MAX).expect("set_timeout failed"), TIMEOUT_MAX_NS);
}

#[test]
fn timeout_on_a_port_without_support_fails() {
    let manager = manager();
    let mut interface = manager.open("NetFPGA").expect("open failed");
    assert_eq!(interface.port_count().expect("port_count failed"), 2);
    assert!(!interface.port_properties(1).expect("properties failed").supports_set_timeout());

    let port = interface.enable_port(1).expect("enable_port failed");
    assert_eq!(port.number(), Some(1));
    let err = port.set_timeout(1_000).expect_err("set_timeout succeeded");
    assert_eq!(adept_code(&err), ERC_NOT_IMP);
}

#[test]
fn enabling_a_missing_port_fails() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let err = interface.enable_port(3).err().expect("enable_port succeeded");
    assert_eq!(adept_code(&err), ERC_INV_PARAM);
}

#[test]
fn a_device_can_only_be_opened_once() {
    let manager = manager();
    let _first = manager.open("SN:210328A1B2C3").expect("open failed");
    let err = manager.open("cmods6").err().expect("second open succeeded");
    assert_eq!(adept_code(&err), ERC_ALREADY_CON);
}

#[test]
fn ports_are_disabled_before_the_interface_is_closed() {
    let manager = manager();
    let mut interface = manager.open("CmodS6").expect("open failed");
    let port = interface.enable().expect("enable failed");
    port.put_reg(5, 0x7f, false).expect("put_reg failed");
    port.disable().expect("disable failed");
    interface.close().expect("close failed");

    let calls: Vec<_> = manager
        .backend()
        .calls()
        .into_iter()
        .filter(|call| matches!(*call, "DeppEnable" | "DeppDisable" | "DmgrClose"))
        .collect();
    assert_eq!(calls, ["DeppEnable", "DeppDisable", "DmgrClose"]);
    assert_eq!(manager.backend().close_while_enabled(), 0);
}

#[test]
fn misordered_close_is_forwarded_uncorrected() {
    let backend = Simulator::new().with_device(cmod());
    let selector = std::ffi::CString::new("CmodS6").expect("selector");
    let mut hif = 0;
    assert!(backend.dmgr_open(&mut hif, &selector));
    assert!(backend.depp_enable(hif));
    backend.clear_calls();

    assert!(backend.dmgr_close(hif));
    assert_eq!(backend.calls(), ["DmgrClose"]);
    assert_eq!(backend.close_while_enabled(), 1);
    assert_eq!(backend.open_handles(), 0);
}

#[test]
fn failed_close_still_invalidates_the_handle() {
    let manager = manager();
    let interface = manager.open("CmodS6").expect("open failed");
    assert!(manager.backend().dmgr_close(interface.handle()));

    let err = interface.close().expect_err("second close succeeded");
    assert_eq!(adept_code(&err), ERC_NOT_CONNECTED);

    let closes = manager
        .backend()
        .calls()
        .into_iter()
        .filter(|call| *call == "DmgrClose")
        .count();
    assert_eq!(closes, 2);
}

#[test]
fn interfaces_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Interface<Simulator>>();

    let manager = manager();
    let interface = manager.open("Basys2").expect("open failed");
    let closed = std::thread::spawn(move || interface.close()).join();
    assert!(matches!(closed, Ok(Ok(()))));
    assert_eq!(manager.backend().open_handles(), 0);
}
