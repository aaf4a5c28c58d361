//! Compositor session backend speaking the EI (emulated input) protocol.
//!
//! Connects to the remote-desktop EIS socket under the runtime directory
//! and drives the session protocol directly: handshake, seat and device
//! advertisement, keyboard capability binding, then keyboard events framed
//! by commit messages. The wire format is little-endian with a 16-byte
//! message header `{object id: u64, length: u32, opcode: u32}`; string
//! arguments carry a u32 length (including the terminating NUL) and are
//! padded to 4 bytes. Events carrying file descriptors (the keymap) are
//! skipped by length; a sender context never needs them.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{Backend, BackendState};
use crate::config::Config;
use crate::error::InjectError;
use crate::sequence::KeyEvent;

const VENDOR_SUBDIR: &str = "gnome-remote-desktop";
const SOCKET_NAME: &str = "eis-0";
const CLIENT_NAME: &str = "synthkey";

const PROTOCOL_VERSION: u32 = 1;
const HANDSHAKE_OBJECT: u64 = 0;
const CONTEXT_TYPE_SENDER: u32 = 1;

const KEY_STATE_RELEASED: u32 = 0;
const KEY_STATE_PRESSED: u32 = 1;

/// Interfaces negotiated during the handshake.
const INTERFACES: &[&str] = &[
    "ei_callback",
    "ei_connection",
    "ei_pingpong",
    "ei_seat",
    "ei_device",
    "ei_keyboard",
];

/// Client-to-server request opcodes.
mod request {
    pub const HANDSHAKE_VERSION: u32 = 0;
    pub const HANDSHAKE_FINISH: u32 = 1;
    pub const HANDSHAKE_CONTEXT_TYPE: u32 = 2;
    pub const HANDSHAKE_NAME: u32 = 3;
    pub const HANDSHAKE_INTERFACE_VERSION: u32 = 4;

    pub const CONNECTION_DISCONNECT: u32 = 1;

    pub const PINGPONG_DONE: u32 = 0;

    pub const SEAT_BIND: u32 = 1;

    pub const DEVICE_START_EMULATING: u32 = 1;
    pub const DEVICE_STOP_EMULATING: u32 = 2;
    pub const DEVICE_FRAME: u32 = 3;

    pub const KEYBOARD_KEY: u32 = 1;
}

/// Server-to-client event opcodes.
mod event {
    pub const HANDSHAKE_VERSION: u32 = 0;
    pub const HANDSHAKE_INTERFACE_VERSION: u32 = 1;
    pub const HANDSHAKE_CONNECTION: u32 = 2;

    pub const CONNECTION_DISCONNECTED: u32 = 0;
    pub const CONNECTION_SEAT: u32 = 1;
    pub const CONNECTION_INVALID_OBJECT: u32 = 2;
    pub const CONNECTION_PING: u32 = 3;

    pub const SEAT_NAME: u32 = 1;
    pub const SEAT_CAPABILITY: u32 = 2;
    pub const SEAT_DONE: u32 = 3;
    pub const SEAT_DEVICE: u32 = 4;

    pub const DEVICE_INTERFACE: u32 = 5;
    pub const DEVICE_DONE: u32 = 6;
    pub const DEVICE_RESUMED: u32 = 7;
    pub const DEVICE_PAUSED: u32 = 8;
}

const HEADER_SIZE: usize = 16;

fn get_u32(buf: &[u8], off: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[off..off + 4]);
    u32::from_le_bytes(bytes)
}

fn get_u64(buf: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(bytes)
}

/// One received message: header plus raw argument bytes.
struct Message {
    object: u64,
    opcode: u32,
    body: Vec<u8>,
}

/// Read bytes without consuming them (`UnixStream::peek` is unstable).
fn peek(stream: &UnixStream, buf: &mut [u8]) -> io::Result<usize> {
    use std::os::unix::io::AsRawFd;
    let n = unsafe {
        libc::recv(
            stream.as_raw_fd(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            libc::MSG_PEEK,
        )
    };
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

fn read_message(stream: &mut UnixStream) -> io::Result<Message> {
    let mut header = [0u8; HEADER_SIZE];
    stream.read_exact(&mut header)?;
    let object = get_u64(&header, 0);
    let length = get_u32(&header, 8) as usize;
    let opcode = get_u32(&header, 12);
    if length < HEADER_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "EIS message length below header size",
        ));
    }
    let mut body = vec![0u8; length - HEADER_SIZE];
    stream.read_exact(&mut body)?;
    Ok(Message { object, opcode, body })
}

/// Sequential argument decoder over a message body.
struct Args<'a> {
    body: &'a [u8],
    off: usize,
}

impl<'a> Args<'a> {
    fn new(message: &'a Message) -> Self {
        Self {
            body: &message.body,
            off: 0,
        }
    }

    fn ensure(&self, len: usize) -> Result<(), InjectError> {
        if self.off + len > self.body.len() {
            return Err(InjectError::Protocol(
                "truncated EIS message argument".to_string(),
            ));
        }
        Ok(())
    }

    fn u32(&mut self) -> Result<u32, InjectError> {
        self.ensure(4)?;
        let v = get_u32(self.body, self.off);
        self.off += 4;
        Ok(v)
    }

    fn u64(&mut self) -> Result<u64, InjectError> {
        self.ensure(8)?;
        let v = get_u64(self.body, self.off);
        self.off += 8;
        Ok(v)
    }

    fn string(&mut self) -> Result<String, InjectError> {
        let len = self.u32()? as usize;
        let padded = (len + 3) & !3;
        self.ensure(padded)?;
        let raw = &self.body[self.off..self.off + len];
        self.off += padded;
        let text = raw.strip_suffix(&[0]).unwrap_or(raw);
        String::from_utf8(text.to_vec())
            .map_err(|_| InjectError::Protocol("non-UTF-8 string in EIS message".to_string()))
    }
}

/// Outgoing request builder; `send` patches the length field and writes the
/// whole message in one call.
struct Request {
    buf: Vec<u8>,
}

impl Request {
    fn new(object: u64, opcode: u32) -> Self {
        let mut buf = Vec::with_capacity(HEADER_SIZE + 16);
        buf.extend_from_slice(&object.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes()); // length, patched on send
        buf.extend_from_slice(&opcode.to_le_bytes());
        Self { buf }
    }

    fn u32(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn string(mut self, s: &str) -> Self {
        let len = s.len() as u32 + 1; // includes terminating NUL
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
        self
    }

    fn send(mut self, stream: &mut UnixStream) -> io::Result<()> {
        let length = self.buf.len() as u32;
        self.buf[8..12].copy_from_slice(&length.to_le_bytes());
        stream.write_all(&self.buf)
    }
}

fn monotonic_micros() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // clock_gettime(CLOCK_MONOTONIC) cannot fail with a valid timespec.
    unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    (ts.tv_sec as u64) * 1_000_000 + (ts.tv_nsec as u64) / 1_000
}

/// Resolve the well-known socket path from the runtime directory.
fn socket_path() -> Option<PathBuf> {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")?;
    Some(PathBuf::from(runtime_dir).join(VENDOR_SUBDIR).join(SOCKET_NAME))
}

/// An established EIS session with a resumed keyboard-capable device.
struct Session {
    stream: UnixStream,
    connection: u64,
    seat: u64,
    device: u64,
    keyboard: u64,
    last_serial: u32,
}

impl Session {
    /// Connect and run the handshake to completion: sender context, socket
    /// attachment, then a bounded wait for a seat advertising keyboard
    /// capability and a resumed device exposing the keyboard interface.
    fn connect(handshake_timeout: Duration, io_timeout: Duration) -> Result<Self, InjectError> {
        let Some(path) = socket_path() else {
            return Err(InjectError::DeviceUnavailable(
                "XDG_RUNTIME_DIR is not set".to_string(),
            ));
        };
        if !path.exists() {
            return Err(InjectError::DeviceUnavailable(format!(
                "EIS socket not found at {}",
                path.display()
            )));
        }

        let stream = UnixStream::connect(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                InjectError::PermissionDenied {
                    path: path.display().to_string(),
                }
            } else {
                InjectError::DeviceUnavailable(format!("cannot connect to EIS socket: {}", e))
            }
        })?;
        stream.set_read_timeout(Some(io_timeout))?;

        let mut session = Session {
            stream,
            connection: 0,
            seat: 0,
            device: 0,
            keyboard: 0,
            last_serial: 0,
        };

        let deadline = Instant::now() + handshake_timeout;
        let mut device_resumed = false;

        while session.keyboard == 0 || !device_resumed {
            if Instant::now() >= deadline {
                return Err(InjectError::DeviceUnavailable(
                    "EIS session handshake timed out".to_string(),
                ));
            }
            let message = match read_message(&mut session.stream) {
                Ok(m) => m,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    return Err(InjectError::DeviceUnavailable(format!(
                        "EIS connection lost during handshake: {}",
                        e
                    )));
                }
            };
            session.handle_setup_message(&message, &mut device_resumed)?;
        }

        // The device is usable; announce emulation before the first event.
        Request::new(session.device, request::DEVICE_START_EMULATING)
            .u32(session.last_serial)
            .u32(1)
            .send(&mut session.stream)
            .map_err(|e| {
                InjectError::DeviceUnavailable(format!("EIS start_emulating failed: {}", e))
            })?;

        Ok(session)
    }

    fn handle_setup_message(
        &mut self,
        message: &Message,
        device_resumed: &mut bool,
    ) -> Result<(), InjectError> {
        let mut args = Args::new(message);

        if message.object == HANDSHAKE_OBJECT {
            match message.opcode {
                event::HANDSHAKE_VERSION => {
                    let version = args.u32()?;
                    self.send_handshake(version.min(PROTOCOL_VERSION))?;
                }
                event::HANDSHAKE_INTERFACE_VERSION => {
                    let name = args.string()?;
                    let version = args.u32()?;
                    debug!("EIS server supports {} v{}", name, version);
                }
                event::HANDSHAKE_CONNECTION => {
                    self.last_serial = args.u32()?;
                    self.connection = args.u64()?;
                    debug!("EIS connection established (object {})", self.connection);
                }
                _ => {}
            }
            return Ok(());
        }

        if message.object == self.connection && self.connection != 0 {
            match message.opcode {
                event::CONNECTION_DISCONNECTED => {
                    let _serial = args.u32()?;
                    let reason = args.u32()?;
                    let explanation = args.string().unwrap_or_default();
                    return Err(InjectError::DeviceUnavailable(format!(
                        "EIS server disconnected (reason {}): {}",
                        reason, explanation
                    )));
                }
                event::CONNECTION_SEAT => {
                    self.seat = args.u64()?;
                }
                event::CONNECTION_INVALID_OBJECT => {
                    return Err(InjectError::Protocol(
                        "EIS server flagged an invalid object".to_string(),
                    ));
                }
                event::CONNECTION_PING => {
                    let pingpong = args.u64()?;
                    Request::new(pingpong, request::PINGPONG_DONE)
                        .u64(0)
                        .send(&mut self.stream)?;
                }
                _ => {}
            }
            return Ok(());
        }

        if message.object == self.seat && self.seat != 0 {
            match message.opcode {
                event::SEAT_NAME => {
                    debug!("EIS seat '{}'", args.string()?);
                }
                event::SEAT_CAPABILITY => {
                    let mask = args.u64()?;
                    let interface = args.string()?;
                    if interface == "ei_keyboard" {
                        // Bind as soon as the keyboard capability is known;
                        // remaining capability events are irrelevant here.
                        Request::new(self.seat, request::SEAT_BIND)
                            .u64(mask)
                            .send(&mut self.stream)?;
                    }
                }
                event::SEAT_DONE => {}
                event::SEAT_DEVICE => {
                    self.device = args.u64()?;
                }
                _ => {}
            }
            return Ok(());
        }

        if message.object == self.device && self.device != 0 {
            match message.opcode {
                event::DEVICE_INTERFACE => {
                    let object = args.u64()?;
                    let interface = args.string()?;
                    if interface == "ei_keyboard" {
                        self.keyboard = object;
                    }
                }
                event::DEVICE_DONE => {
                    if self.keyboard == 0 {
                        // Not a keyboard device; wait for the next one.
                        debug!("EIS device without keyboard interface, ignoring");
                        self.device = 0;
                    }
                }
                event::DEVICE_RESUMED => {
                    self.last_serial = args.u32()?;
                    *device_resumed = true;
                }
                event::DEVICE_PAUSED => {
                    self.last_serial = args.u32()?;
                    *device_resumed = false;
                }
                _ => {}
            }
            return Ok(());
        }

        debug!(
            "Ignoring EIS message for object {} opcode {}",
            message.object, message.opcode
        );
        Ok(())
    }

    fn send_handshake(&mut self, version: u32) -> Result<(), InjectError> {
        Request::new(HANDSHAKE_OBJECT, request::HANDSHAKE_VERSION)
            .u32(version)
            .send(&mut self.stream)?;
        Request::new(HANDSHAKE_OBJECT, request::HANDSHAKE_NAME)
            .string(CLIENT_NAME)
            .send(&mut self.stream)?;
        Request::new(HANDSHAKE_OBJECT, request::HANDSHAKE_CONTEXT_TYPE)
            .u32(CONTEXT_TYPE_SENDER)
            .send(&mut self.stream)?;
        for interface in INTERFACES {
            Request::new(HANDSHAKE_OBJECT, request::HANDSHAKE_INTERFACE_VERSION)
                .string(interface)
                .u32(PROTOCOL_VERSION)
                .send(&mut self.stream)?;
        }
        Request::new(HANDSHAKE_OBJECT, request::HANDSHAKE_FINISH).send(&mut self.stream)?;
        Ok(())
    }

    /// Process server events that arrived since the last write. The server
    /// may ping at any time and expects a prompt pingpong, and a disconnect
    /// notice must fail the injection rather than linger until a write
    /// returns EPIPE. Only whole pending messages are consumed: the header
    /// is peeked non-blockingly, then the message is read under the normal
    /// read timeout.
    fn drain_incoming(&mut self) -> Result<(), InjectError> {
        loop {
            self.stream.set_nonblocking(true)?;
            let mut header = [0u8; HEADER_SIZE];
            let peeked = peek(&self.stream, &mut header);
            self.stream.set_nonblocking(false)?;

            match peeked {
                Ok(0) => {
                    return Err(InjectError::Protocol(
                        "EIS server closed the connection".to_string(),
                    ));
                }
                Ok(n) if n < HEADER_SIZE => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => {
                    return Err(InjectError::Protocol(format!("EIS read failed: {}", e)));
                }
            }

            let message = read_message(&mut self.stream)
                .map_err(|e| InjectError::Protocol(format!("EIS read failed: {}", e)))?;
            self.handle_live_message(&message)?;
        }
    }

    /// One server event received after the session became usable.
    fn handle_live_message(&mut self, message: &Message) -> Result<(), InjectError> {
        let mut args = Args::new(message);

        if message.object == self.connection {
            match message.opcode {
                event::CONNECTION_DISCONNECTED => {
                    let _serial = args.u32()?;
                    let reason = args.u32()?;
                    let explanation = args.string().unwrap_or_default();
                    return Err(InjectError::Protocol(format!(
                        "EIS server disconnected (reason {}): {}",
                        reason, explanation
                    )));
                }
                event::CONNECTION_INVALID_OBJECT => {
                    return Err(InjectError::Protocol(
                        "EIS server flagged an invalid object".to_string(),
                    ));
                }
                event::CONNECTION_PING => {
                    let pingpong = args.u64()?;
                    Request::new(pingpong, request::PINGPONG_DONE)
                        .u64(0)
                        .send(&mut self.stream)?;
                }
                _ => {}
            }
            return Ok(());
        }

        if message.object == self.device {
            // Track the serial so later frames carry the current one.
            if matches!(message.opcode, event::DEVICE_RESUMED | event::DEVICE_PAUSED) {
                self.last_serial = args.u32()?;
            }
            return Ok(());
        }

        debug!(
            "Ignoring EIS message for object {} opcode {}",
            message.object, message.opcode
        );
        Ok(())
    }

    fn key(&mut self, code: u32, pressed: bool) -> Result<(), InjectError> {
        self.drain_incoming()?;
        let state = if pressed {
            KEY_STATE_PRESSED
        } else {
            KEY_STATE_RELEASED
        };
        Request::new(self.keyboard, request::KEYBOARD_KEY)
            .u32(code)
            .u32(state)
            .send(&mut self.stream)
            .map_err(|e| InjectError::Protocol(format!("EIS key event failed: {}", e)))
    }

    fn frame(&mut self) -> Result<(), InjectError> {
        self.drain_incoming()?;
        Request::new(self.device, request::DEVICE_FRAME)
            .u32(self.last_serial)
            .u64(monotonic_micros())
            .send(&mut self.stream)
            .map_err(|e| InjectError::Protocol(format!("EIS frame failed: {}", e)))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort teardown; the server also cleans up on hangup.
        if self.device != 0 {
            let _ = Request::new(self.device, request::DEVICE_STOP_EMULATING)
                .u32(self.last_serial)
                .send(&mut self.stream);
        }
        if self.connection != 0 {
            let _ = Request::new(self.connection, request::CONNECTION_DISCONNECT)
                .send(&mut self.stream);
        }
    }
}

enum State {
    Unprobed,
    Ready(Session),
    Unavailable,
}

pub struct EisBackend {
    handshake_timeout: Duration,
    io_timeout: Duration,
    state: State,
}

impl EisBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            handshake_timeout: Duration::from_millis(config.timeouts.handshake_timeout_ms),
            io_timeout: Duration::from_millis(config.timeouts.io_timeout_ms),
            state: State::Unprobed,
        }
    }
}

impl Backend for EisBackend {
    fn name(&self) -> &'static str {
        "eis"
    }

    fn probe(&mut self) -> BackendState {
        if matches!(self.state, State::Unprobed) {
            self.state = match Session::connect(self.handshake_timeout, self.io_timeout) {
                Ok(session) => {
                    info!("Connected to EIS server with a keyboard-capable device");
                    State::Ready(session)
                }
                Err(e) => {
                    warn!("EIS backend unavailable: {}", e);
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
        let State::Ready(session) = &mut self.state else {
            return Err(InjectError::DeviceUnavailable(
                "EIS backend is not ready".to_string(),
            ));
        };
        session.key(event.key.code() as u32, event.pressed)
    }

    fn flush_sync(&mut self) -> Result<(), InjectError> {
        let State::Ready(session) = &mut self.state else {
            return Err(InjectError::DeviceUnavailable(
                "EIS backend is not ready".to_string(),
            ));
        };
        session.frame()
    }
}
