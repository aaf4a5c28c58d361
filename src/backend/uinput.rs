//! Kernel virtual keyboard via /dev/uinput.
//!
//! Probing creates a uinput device that declares exactly the capability set
//! the layout tables can produce (plus both shift keys), then waits a fixed
//! settle delay so the device is visible to the input stack before the
//! first event. Events are written as raw `input_event` records; the record
//! layout is bit-exact against the kernel input ABI.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::{Backend, BackendState};
use crate::config::Config;
use crate::error::InjectError;
use crate::layout::Key;
use crate::sequence::KeyEvent;

const UINPUT_PATH: &str = "/dev/uinput";

/// Fixed identity of the virtual device.
pub const DEVICE_NAME: &str = "synthkey virtual keyboard";
const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x5678;

// input-event-codes.h
const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const SYN_REPORT: u16 = 0;
const BUS_USB: u16 = 0x03;

const UINPUT_MAX_NAME_SIZE: usize = 80;

// Kernel ioctl request encoding: nr in bits 0-7, type in 8-15, argument
// size in 16-29, direction in 30-31 (write = 1).
const IOC_WRITE: libc::c_ulong = 1;

const fn ioc(dir: libc::c_ulong, ty: u8, nr: u8, size: usize) -> libc::c_ulong {
    (dir << 30) | ((size as libc::c_ulong) << 16) | ((ty as libc::c_ulong) << 8) | (nr as libc::c_ulong)
}

const UI_SET_EVBIT: libc::c_ulong = ioc(IOC_WRITE, b'U', 100, mem::size_of::<libc::c_int>());
const UI_SET_KEYBIT: libc::c_ulong = ioc(IOC_WRITE, b'U', 101, mem::size_of::<libc::c_int>());
const UI_DEV_SETUP: libc::c_ulong = ioc(IOC_WRITE, b'U', 3, mem::size_of::<UinputSetup>());
const UI_DEV_CREATE: libc::c_ulong = ioc(0, b'U', 1, 0);
const UI_DEV_DESTROY: libc::c_ulong = ioc(0, b'U', 2, 0);

#[repr(C)]
struct InputId {
    bustype: u16,
    vendor: u16,
    product: u16,
    version: u16,
}

#[repr(C)]
struct UinputSetup {
    id: InputId,
    name: [u8; UINPUT_MAX_NAME_SIZE],
    ff_effects_max: u32,
}

/// struct input_event: `{time, type, code, value}`. The kernel fills in the
/// timestamp on write, so it is sent zeroed.
#[repr(C)]
struct InputEvent {
    time: libc::timeval,
    type_: u16,
    code: u16,
    value: i32,
}

fn ioctl_with_int(fd: &OwnedFd, cmd: libc::c_ulong, arg: libc::c_int, cmd_name: &str) -> Result<(), InjectError> {
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), cmd, arg) };
    if ret < 0 {
        return Err(InjectError::DeviceUnavailable(format!(
            "{} failed: {}",
            cmd_name,
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

fn ioctl_with_ref<T>(fd: &OwnedFd, cmd: libc::c_ulong, arg: &T, cmd_name: &str) -> Result<(), InjectError> {
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), cmd, arg as *const T) };
    if ret < 0 {
        return Err(InjectError::DeviceUnavailable(format!(
            "{} failed: {}",
            cmd_name,
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

fn ioctl_no_arg(fd: &OwnedFd, cmd: libc::c_ulong, cmd_name: &str) -> Result<(), InjectError> {
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), cmd) };
    if ret < 0 {
        return Err(InjectError::DeviceUnavailable(format!(
            "{} failed: {}",
            cmd_name,
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

fn open_control_path() -> Result<OwnedFd, InjectError> {
    let fd = unsafe {
        libc::open(
            b"/dev/uinput\0".as_ptr() as *const libc::c_char,
            libc::O_WRONLY | libc::O_NONBLOCK,
        )
    };
    if fd < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::PermissionDenied {
            return Err(InjectError::PermissionDenied {
                path: UINPUT_PATH.to_string(),
            });
        }
        return Err(InjectError::DeviceUnavailable(format!(
            "cannot open {}: {}",
            UINPUT_PATH, err
        )));
    }
    // Safety: fd was just returned by open() and is owned here.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Open the control path, declare the capability set, and instantiate the
/// device. Any failing declaration step aborts creation.
fn create_device(settle_delay: Duration) -> Result<OwnedFd, InjectError> {
    let fd = open_control_path()?;

    ioctl_with_int(&fd, UI_SET_EVBIT, EV_KEY as libc::c_int, "UI_SET_EVBIT(EV_KEY)")?;
    ioctl_with_int(&fd, UI_SET_EVBIT, EV_SYN as libc::c_int, "UI_SET_EVBIT(EV_SYN)")?;

    for key in Key::ALL {
        ioctl_with_int(&fd, UI_SET_KEYBIT, key.code() as libc::c_int, "UI_SET_KEYBIT")?;
    }

    let mut setup = UinputSetup {
        id: InputId {
            bustype: BUS_USB,
            vendor: VENDOR_ID,
            product: PRODUCT_ID,
            version: 0,
        },
        name: [0; UINPUT_MAX_NAME_SIZE],
        ff_effects_max: 0,
    };
    let name = DEVICE_NAME.as_bytes();
    setup.name[..name.len()].copy_from_slice(name);

    ioctl_with_ref(&fd, UI_DEV_SETUP, &setup, "UI_DEV_SETUP")?;
    ioctl_no_arg(&fd, UI_DEV_CREATE, "UI_DEV_CREATE")?;

    // The device is not visible to the input stack immediately after
    // UI_DEV_CREATE; events written before it settles are dropped.
    thread::sleep(settle_delay);

    Ok(fd)
}

fn write_event(fd: &OwnedFd, type_: u16, code: u16, value: i32) -> Result<(), InjectError> {
    let event = InputEvent {
        time: libc::timeval { tv_sec: 0, tv_usec: 0 },
        type_,
        code,
        value,
    };
    let len = mem::size_of::<InputEvent>();
    let written = unsafe {
        libc::write(
            fd.as_raw_fd(),
            &event as *const InputEvent as *const libc::c_void,
            len,
        )
    };
    if written != len as isize {
        if written < 0 {
            return Err(InjectError::Protocol(format!(
                "uinput write failed: {}",
                io::Error::last_os_error()
            )));
        }
        return Err(InjectError::Protocol(format!(
            "short write to uinput device: {} of {} bytes",
            written, len
        )));
    }
    Ok(())
}

enum State {
    Unprobed,
    Ready(OwnedFd),
    Unavailable,
}

pub struct UinputBackend {
    settle_delay: Duration,
    state: State,
}

impl UinputBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.backend.settle_delay_ms),
            state: State::Unprobed,
        }
    }
}

impl Backend for UinputBackend {
    fn name(&self) -> &'static str {
        "uinput"
    }

    fn probe(&mut self) -> BackendState {
        if matches!(self.state, State::Unprobed) {
            self.state = match create_device(self.settle_delay) {
                Ok(fd) => {
                    info!("Created virtual keyboard '{}'", DEVICE_NAME);
                    State::Ready(fd)
                }
                Err(e) => {
                    warn!("uinput backend unavailable: {}", e);
                    if matches!(e, InjectError::PermissionDenied { .. }) {
                        warn!("Add your user to the 'input' group to use the uinput backend");
                    }
                    State::Unavailable
                }
            };
        }
        match self.state {
            State::Ready(_) => BackendState::Ready,
            _ => BackendState::Unavailable,
        }
    }

    fn submit(&mut self, event: KeyEvent) -> Result<(), InjectError> {
        let State::Ready(fd) = &self.state else {
            return Err(InjectError::DeviceUnavailable(
                "uinput backend is not ready".to_string(),
            ));
        };
        write_event(fd, EV_KEY, event.key.code(), if event.pressed { 1 } else { 0 })
    }

    fn flush_sync(&mut self) -> Result<(), InjectError> {
        let State::Ready(fd) = &self.state else {
            return Err(InjectError::DeviceUnavailable(
                "uinput backend is not ready".to_string(),
            ));
        };
        write_event(fd, EV_SYN, SYN_REPORT, 0)
    }
}

impl Drop for UinputBackend {
    fn drop(&mut self) {
        if let State::Ready(fd) = &self.state {
            // Tear the device down before the fd closes; errors at this
            // point have no recovery path.
            let ret = unsafe { libc::ioctl(fd.as_raw_fd(), UI_DEV_DESTROY) };
            if ret < 0 {
                warn!("UI_DEV_DESTROY failed: {}", io::Error::last_os_error());
            }
        }
    }
}
