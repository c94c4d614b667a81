// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! VNC session management: connection lifecycle, background reader and
//! client input.
//!
//! [`VncSession`] owns one connection to a VNC server and walks it through
//! the protocol phases:
//!
//! 1. **Handshake**: protocol version exchange and security negotiation
//!    ([`connect`](VncSession::connect), optionally
//!    [`authenticate`](VncSession::authenticate))
//! 2. **Initialization**: `ClientInit`/`ServerInit`, framebuffer allocation,
//!    encoding and pixel format selection
//!    ([`initialize`](VncSession::initialize))
//! 3. **Normal operation**: a background reader task decodes framebuffer
//!    updates and emits [`SessionEvent`]s while the application writes input
//!    events ([`start_updates`](VncSession::start_updates))
//!
//! # Concurrency
//!
//! The reader task exclusively owns the read half of the connection, the
//! pixel reader, the ZRLE inflater, and takes the framebuffer write lock per
//! update. All writes go through one mutex-guarded write stream, shared by
//! the reader (update requests) and the application (input events). The two
//! sides meet in three atomic flags: the cooperative `done` flag, the
//! `full_refresh` request and the connection-lost latch.
//!
//! Sessions are single-shot: after [`disconnect`](VncSession::disconnect)
//! (or a connection loss) a new session must be created.

use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::auth;
use crate::encoding::{decode_rectangle, EncodingType, ZrleInflater, PREFERRED_ENCODINGS};
use crate::error::{Result, VncError};
use crate::events::SessionEvent;
use crate::framebuffer::Framebuffer;
use crate::input::InputPolicy;
use crate::pixel::PixelReader;
use crate::protocol::{self, PixelFormat, Rectangle, ServerBanner, ServerInit, VersionQuirks};
use crate::wire::{RfbInStream, RfbOutStream};

/// Default read and write deadline on the connection.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(15);

/// How long `disconnect` waits for the reader task before aborting it.
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Limit clipboard size to prevent memory exhaustion attacks.
const MAX_CUT_TEXT: usize = 10 * 1024 * 1024; // 10MB limit

/// Connection parameters for a [`VncSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server TCP port (conventionally `5900 + display`).
    pub port: u16,
    /// Whether to request a shared session in `ClientInit`.
    pub shared: bool,
    /// Proxy ID sent if the server turns out to be an UltraVNC repeater.
    pub repeater_proxy_id: Option<String>,
    /// Read/write deadline for all socket I/O.
    pub io_timeout: Duration,
    /// Version banner quirk table.
    pub quirks: VersionQuirks,
}

impl SessionConfig {
    /// Configuration for a direct `host:port` connection.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            shared: true,
            repeater_proxy_id: None,
            io_timeout: DEFAULT_IO_TIMEOUT,
            quirks: VersionQuirks::default(),
        }
    }

    /// Configuration for a display number (`port = 5900 + display`).
    pub fn for_display(host: impl Into<String>, display: u16) -> Self {
        Self::new(host, 5900 + display)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection. Initial and terminal state.
    Disconnected,
    /// TCP and protocol handshake in progress.
    Connecting,
    /// The server requires VNC authentication; waiting for
    /// [`authenticate`](VncSession::authenticate).
    AwaitingPassword,
    /// Security passed; waiting for [`initialize`](VncSession::initialize).
    Initializing,
    /// Fully initialized; updates may be running.
    Connected,
    /// [`disconnect`](VncSession::disconnect) in progress.
    Disconnecting,
}

/// A client session with a VNC server.
///
/// Events (framebuffer updates, bell, server clipboard, connection loss)
/// arrive on the channel returned by [`VncSession::new`]. They are emitted
/// from the background reader task; the host marshals them onto its own
/// threads as needed.
pub struct VncSession {
    config: SessionConfig,
    state: SessionState,
    /// Negotiated protocol minor version (3, 7 or 8).
    minor: u8,
    read_stream: Option<RfbInStream<OwnedReadHalf>>,
    write_stream: Option<Arc<Mutex<RfbOutStream<OwnedWriteHalf>>>>,
    framebuffer: Option<Arc<RwLock<Framebuffer>>>,
    input_policy: InputPolicy,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    done: Arc<AtomicBool>,
    full_refresh: Arc<AtomicBool>,
    connection_lost: Arc<AtomicBool>,
    reader_task: Option<JoinHandle<()>>,
}

impl VncSession {
    /// Creates a session and the channel its events will arrive on.
    pub fn new(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = Self {
            config,
            state: SessionState::Disconnected,
            minor: 0,
            read_stream: None,
            write_stream: None,
            framebuffer: None,
            input_policy: InputPolicy::default(),
            event_tx,
            done: Arc::new(AtomicBool::new(false)),
            full_refresh: Arc::new(AtomicBool::new(false)),
            connection_lost: Arc::new(AtomicBool::new(false)),
            reader_task: None,
        };
        (session, event_rx)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The framebuffer mirror, available once
    /// [`initialize`](Self::initialize) has completed.
    pub fn framebuffer(&self) -> Option<Arc<RwLock<Framebuffer>>> {
        self.framebuffer.clone()
    }

    /// Replaces the input policy (e.g. to toggle view-only mode).
    pub fn set_input_policy(&mut self, policy: InputPolicy) {
        self.input_policy = policy;
    }

    /// Asks the reader to issue the next update request non-incrementally,
    /// forcing a full-screen refresh.
    pub fn request_full_refresh(&self) {
        self.full_refresh.store(true, Ordering::SeqCst);
    }

    /// Opens the TCP connection and performs version and security
    /// negotiation.
    ///
    /// Returns `true` when the server requires a password, in which case
    /// [`authenticate`](Self::authenticate) must run before
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// [`VncError::InvalidOperation`] when called outside the
    /// `Disconnected` state or with an empty host;
    /// [`VncError::UnsupportedVersion`] / [`VncError::HandshakeRejected`] /
    /// [`VncError::Io`] for negotiation failures. Any failure returns the
    /// session to `Disconnected`.
    pub async fn connect(&mut self) -> Result<bool> {
        if self.state != SessionState::Disconnected {
            return Err(VncError::InvalidOperation(format!(
                "connect called in state {:?}",
                self.state
            )));
        }
        if self.config.host.is_empty() {
            return Err(VncError::InvalidOperation("host must not be empty".to_string()));
        }
        self.state = SessionState::Connecting;
        match self.connect_inner().await {
            Ok(needs_auth) => Ok(needs_auth),
            Err(e) => {
                self.read_stream = None;
                self.write_stream = None;
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn connect_inner(&mut self) -> Result<bool> {
        let stream =
            TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
        // Disable Nagle's algorithm for immediate event delivery.
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        let mut inp = RfbInStream::new(read_half);
        inp.set_timeout(Some(self.config.io_timeout));
        let mut out = RfbOutStream::new(write_half);
        out.set_timeout(Some(self.config.io_timeout));

        let mut banner = [0u8; 12];
        inp.read_exact(&mut banner).await?;
        let minor = match protocol::parse_server_banner(&banner, &self.config.quirks)? {
            ServerBanner::Version(minor) => minor,
            ServerBanner::Repeater => {
                let proxy_id = self.config.repeater_proxy_id.as_deref().ok_or_else(|| {
                    VncError::Protocol(
                        "server is a repeater but no proxy ID is configured".to_string(),
                    )
                })?;
                protocol::write_repeater_id(&mut out, proxy_id)?;
                out.flush().await?;
                inp.read_exact(&mut banner).await?;
                match protocol::parse_server_banner(&banner, &self.config.quirks)? {
                    ServerBanner::Version(minor) => minor,
                    ServerBanner::Repeater => {
                        return Err(VncError::Protocol(
                            "repeater banner received twice".to_string(),
                        ))
                    }
                }
            }
        };
        out.write_bytes(&protocol::client_banner(minor));
        out.flush().await?;
        self.minor = minor;
        #[cfg(feature = "debug-logging")]
        log::info!("negotiated protocol version 3.{minor}");

        let offered = protocol::read_security_types(&mut inp, minor).await?;
        let chosen = protocol::choose_security_type(&offered).ok_or_else(|| {
            VncError::HandshakeRejected(format!(
                "server offered no supported security type: {offered:?}"
            ))
        })?;
        if minor >= 7 {
            out.write_u8(chosen);
            out.flush().await?;
        }

        let needs_auth = chosen == protocol::SECURITY_TYPE_VNC_AUTH;
        if needs_auth {
            self.state = SessionState::AwaitingPassword;
        } else {
            // SecurityResult follows the None type only on 3.8.
            if minor == 8 {
                let result = inp.read_u32().await?;
                if result != protocol::SECURITY_RESULT_OK {
                    let reason = protocol::read_failure_reason(&mut inp)
                        .await
                        .unwrap_or_default();
                    return Err(VncError::HandshakeRejected(reason));
                }
            }
            self.state = SessionState::Initializing;
        }

        self.read_stream = Some(inp);
        self.write_stream = Some(Arc::new(Mutex::new(out)));
        Ok(needs_auth)
    }

    /// Answers the server's VNC authentication challenge.
    ///
    /// Returns `false` (and closes the connection) when the server rejects
    /// the password; the host may create a new session and prompt again.
    ///
    /// # Errors
    ///
    /// [`VncError::InvalidOperation`] outside the `AwaitingPassword` state,
    /// [`VncError::Io`] on connection failure.
    pub async fn authenticate(&mut self, password: &str) -> Result<bool> {
        if self.state != SessionState::AwaitingPassword {
            return Err(VncError::InvalidOperation(format!(
                "authenticate called in state {:?}",
                self.state
            )));
        }
        let inp = self
            .read_stream
            .as_mut()
            .ok_or(VncError::ConnectionClosed)?;
        let writer = self
            .write_stream
            .as_ref()
            .ok_or(VncError::ConnectionClosed)?;

        let mut challenge = [0u8; 16];
        inp.read_exact(&mut challenge).await?;
        let response = auth::solve_challenge(password, &challenge);
        {
            let mut out = writer.lock().await;
            out.write_bytes(&response);
            out.flush().await?;
        }

        let result = inp.read_u32().await?;
        if result == protocol::SECURITY_RESULT_OK {
            info!("VNC authentication succeeded");
            self.state = SessionState::Initializing;
            return Ok(true);
        }
        if self.minor == 8 {
            match protocol::read_failure_reason(inp).await {
                Ok(reason) => warn!("VNC authentication failed: {reason}"),
                Err(_) => warn!("VNC authentication failed"),
            }
        } else {
            warn!("VNC authentication failed");
        }
        self.read_stream = None;
        self.write_stream = None;
        self.state = SessionState::Disconnected;
        Ok(false)
    }

    /// Completes initialization: `ClientInit`/`ServerInit`, framebuffer
    /// allocation, `SetEncodings` and the optional `SetPixelFormat`
    /// override.
    ///
    /// `bits_per_pixel`/`depth` select one of the preset wire formats (see
    /// [`PixelFormat::preset`]); any unrecognized pair keeps the format the
    /// server advertised.
    pub async fn initialize(&mut self, bits_per_pixel: u8, depth: u8) -> Result<()> {
        if self.state != SessionState::Initializing {
            return Err(VncError::InvalidOperation(format!(
                "initialize called in state {:?}",
                self.state
            )));
        }
        let shared = self.config.shared;
        let writer = self
            .write_stream
            .as_ref()
            .ok_or(VncError::ConnectionClosed)?
            .clone();
        {
            let mut out = writer.lock().await;
            protocol::write_client_init(&mut out, shared);
            out.flush().await?;
        }

        let inp = self
            .read_stream
            .as_mut()
            .ok_or(VncError::ConnectionClosed)?;
        let server_init = ServerInit::read_from(inp).await?;
        if !server_init.pixel_format.is_valid() {
            return Err(VncError::Protocol(format!(
                "server advertised an invalid pixel format: {:?}",
                server_init.pixel_format
            )));
        }
        info!(
            "connected to \"{}\" ({}x{}, {}bpp)",
            server_init.name,
            server_init.framebuffer_width,
            server_init.framebuffer_height,
            server_init.pixel_format.bits_per_pixel
        );

        let mut fb = Framebuffer::new(
            server_init.framebuffer_width,
            server_init.framebuffer_height,
            server_init.pixel_format,
            server_init.name,
        );

        {
            let mut out = writer.lock().await;
            protocol::write_set_encodings(&mut out, &PREFERRED_ENCODINGS);
            if let Some(preset) = PixelFormat::preset(bits_per_pixel, depth) {
                protocol::write_set_pixel_format(&mut out, &preset);
                fb.set_format(preset);
            }
            out.flush().await?;
        }

        self.framebuffer = Some(Arc::new(RwLock::new(fb)));
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Spawns the background reader task.
    ///
    /// The reader issues the initial full update request, then decodes
    /// server messages and re-requests updates after each processed frame.
    pub fn start_updates(&mut self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(VncError::InvalidOperation(format!(
                "start_updates called in state {:?}",
                self.state
            )));
        }
        if self.reader_task.is_some() {
            return Err(VncError::InvalidOperation(
                "reader task already running".to_string(),
            ));
        }
        let stream = self
            .read_stream
            .take()
            .ok_or(VncError::ConnectionClosed)?;
        let writer = self
            .write_stream
            .as_ref()
            .ok_or(VncError::ConnectionClosed)?
            .clone();
        let framebuffer = self
            .framebuffer
            .as_ref()
            .ok_or(VncError::ConnectionClosed)?
            .clone();

        let task = ReaderTask {
            stream,
            writer,
            framebuffer,
            events: self.event_tx.clone(),
            done: Arc::clone(&self.done),
            full_refresh: Arc::clone(&self.full_refresh),
            connection_lost: Arc::clone(&self.connection_lost),
        };
        self.reader_task = Some(tokio::spawn(task.run()));
        Ok(())
    }

    /// Shuts the session down.
    ///
    /// Signals the reader, wakes its blocking read with a 1x1 incremental
    /// update request, waits up to 3 seconds for it to exit (aborting it
    /// past the deadline) and closes the socket.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        self.state = SessionState::Disconnecting;
        self.done.store(true, Ordering::SeqCst);

        if let Some(writer) = &self.write_stream {
            let mut out = writer.lock().await;
            protocol::write_framebuffer_update_request(&mut out, true, 0, 0, 1, 1);
            if let Err(e) = out.flush().await {
                warn!("wake-up request failed during disconnect: {e}");
            }
        }

        if let Some(mut task) = self.reader_task.take() {
            if tokio::time::timeout(READER_JOIN_TIMEOUT, &mut task)
                .await
                .is_err()
            {
                warn!(
                    "reader task did not exit within {READER_JOIN_TIMEOUT:?}, aborting it"
                );
                task.abort();
            }
        }

        self.read_stream = None;
        self.write_stream = None;
        self.state = SessionState::Disconnected;
        info!("session disconnected");
        Ok(())
    }

    /// Sends a key press or release. Dropped silently in view-only mode.
    pub async fn write_key_event(&self, keysym: u32, down: bool) -> Result<()> {
        if !self.input_policy.allows_pointer_and_keys() {
            return Ok(());
        }
        self.send_message(|out| protocol::write_key_event(out, keysym, down))
            .await
    }

    /// Sends a pointer event. Dropped silently in view-only mode.
    pub async fn write_pointer_event(&self, button_mask: u8, x: u16, y: u16) -> Result<()> {
        if !self.input_policy.allows_pointer_and_keys() {
            return Ok(());
        }
        self.send_message(|out| protocol::write_pointer_event(out, button_mask, x, y))
            .await
    }

    /// Sends clipboard text. Forwards even in view-only mode.
    pub async fn write_client_cut_text(&self, text: &str) -> Result<()> {
        self.send_message(|out| protocol::write_client_cut_text(out, text))
            .await
    }

    async fn send_message<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(&mut RfbOutStream<OwnedWriteHalf>),
    {
        let writer = self
            .write_stream
            .as_ref()
            .ok_or(VncError::ConnectionClosed)?;
        let mut out = writer.lock().await;
        build(&mut out);
        match out.flush().await {
            Ok(()) => Ok(()),
            Err(e) => {
                if !self.done.load(Ordering::SeqCst) {
                    emit_connection_lost(&self.connection_lost, &self.event_tx);
                }
                Err(e.into())
            }
        }
    }
}

/// Fires the `ConnectionLost` event exactly once per session.
fn emit_connection_lost(latch: &AtomicBool, events: &mpsc::UnboundedSender<SessionEvent>) {
    if !latch.swap(true, Ordering::SeqCst) {
        let _ = events.send(SessionEvent::ConnectionLost);
    }
}

/// The background reader: owns the read half, decodes server messages and
/// keeps the update request cycle going.
struct ReaderTask {
    stream: RfbInStream<OwnedReadHalf>,
    writer: Arc<Mutex<RfbOutStream<OwnedWriteHalf>>>,
    framebuffer: Arc<RwLock<Framebuffer>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    done: Arc<AtomicBool>,
    full_refresh: Arc<AtomicBool>,
    connection_lost: Arc<AtomicBool>,
}

impl ReaderTask {
    async fn run(mut self) {
        let pixel_reader = PixelReader::new(*self.framebuffer.read().await.format());
        let mut inflater = ZrleInflater::new();

        if let Err(e) = self.request_update(false).await {
            if !self.done.load(Ordering::SeqCst) {
                error!("initial update request failed: {e}");
                emit_connection_lost(&self.connection_lost, &self.events);
            }
            return;
        }

        // Two-strike policy: one failed read is treated as an idle tick and
        // answered with a fresh update request; the second consecutive
        // failure ends the session.
        let mut failed_reads = 0u8;
        loop {
            if self.done.load(Ordering::SeqCst) {
                return;
            }
            match self.read_message(&pixel_reader, &mut inflater).await {
                Ok(processed_update) => {
                    failed_reads = 0;
                    if processed_update && !self.continue_after_frame().await {
                        return;
                    }
                }
                Err(VncError::Io(e)) => {
                    if self.done.load(Ordering::SeqCst) {
                        return;
                    }
                    failed_reads += 1;
                    if failed_reads >= 2 {
                        error!("giving up after consecutive read failures: {e}");
                        emit_connection_lost(&self.connection_lost, &self.events);
                        return;
                    }
                    warn!("server message read failed ({e}); re-requesting update");
                    if !self.continue_after_frame().await {
                        return;
                    }
                }
                Err(e) => {
                    error!("fatal protocol error: {e}");
                    if !self.done.load(Ordering::SeqCst) {
                        emit_connection_lost(&self.connection_lost, &self.events);
                    }
                    return;
                }
            }
        }
    }

    /// Issues the next update request, consuming a pending full-refresh
    /// flag. Returns `false` when the loop should exit.
    async fn continue_after_frame(&mut self) -> bool {
        if self.done.load(Ordering::SeqCst) {
            return false;
        }
        let incremental = !self.full_refresh.swap(false, Ordering::SeqCst);
        if let Err(e) = self.request_update(incremental).await {
            if !self.done.load(Ordering::SeqCst) {
                error!("update request failed: {e}");
                emit_connection_lost(&self.connection_lost, &self.events);
            }
            return false;
        }
        true
    }

    async fn request_update(&mut self, incremental: bool) -> Result<()> {
        let (width, height) = {
            let fb = self.framebuffer.read().await;
            (fb.width(), fb.height())
        };
        let mut out = self.writer.lock().await;
        protocol::write_framebuffer_update_request(&mut out, incremental, 0, 0, width, height);
        out.flush().await?;
        Ok(())
    }

    /// Reads and dispatches one server message. Returns `true` when the
    /// message was a `FramebufferUpdate` (and a new request is due).
    async fn read_message(
        &mut self,
        pixel_reader: &PixelReader,
        inflater: &mut ZrleInflater,
    ) -> Result<bool> {
        let msg_type = self.stream.read_u8().await?;
        match msg_type {
            protocol::SERVER_MSG_FRAMEBUFFER_UPDATE => {
                self.handle_framebuffer_update(pixel_reader, inflater)
                    .await?;
                Ok(true)
            }
            protocol::SERVER_MSG_SET_COLOUR_MAP_ENTRIES => {
                self.handle_colour_map_entries().await?;
                Ok(false)
            }
            protocol::SERVER_MSG_BELL => {
                #[cfg(feature = "debug-logging")]
                log::info!("server bell");
                let _ = self.events.send(SessionEvent::Bell);
                Ok(false)
            }
            protocol::SERVER_MSG_SERVER_CUT_TEXT => {
                self.handle_server_cut_text().await?;
                Ok(false)
            }
            other => Err(VncError::Protocol(format!(
                "unknown server message type {other}"
            ))),
        }
    }

    async fn handle_framebuffer_update(
        &mut self,
        pixel_reader: &PixelReader,
        inflater: &mut ZrleInflater,
    ) -> Result<()> {
        self.stream.read_padding(1).await?;
        let rect_count = self.stream.read_u16().await?;
        #[cfg(feature = "debug-logging")]
        log::info!("framebuffer update with {rect_count} rectangles");

        // The write lock is held for the whole update so the host only ever
        // observes frame-consistent pixels.
        let framebuffer = Arc::clone(&self.framebuffer);
        let mut fb = framebuffer.write().await;
        for _ in 0..rect_count {
            if self.done.load(Ordering::SeqCst) {
                return Ok(());
            }
            let rect = Rectangle::read_from(&mut self.stream).await?;
            let encoding = EncodingType::from_wire(rect.encoding).ok_or_else(|| {
                VncError::Protocol(format!(
                    "server sent unrequested encoding {}",
                    rect.encoding
                ))
            })?;
            decode_rectangle(
                &rect,
                encoding,
                &mut self.stream,
                pixel_reader,
                inflater,
                &mut fb,
            )
            .await?;
            let _ = self.events.send(SessionEvent::FramebufferUpdated { rect });
        }
        Ok(())
    }

    async fn handle_colour_map_entries(&mut self) -> Result<()> {
        self.stream.read_padding(1).await?;
        let first = self.stream.read_u16().await?;
        let count = self.stream.read_u16().await?;
        let framebuffer = Arc::clone(&self.framebuffer);
        let mut fb = framebuffer.write().await;
        for i in 0..count {
            let red = self.stream.read_u16().await?;
            let green = self.stream.read_u16().await?;
            let blue = self.stream.read_u16().await?;
            let index = u32::from(first) + u32::from(i);
            // Entries past the 256-entry map are consumed but ignored.
            if let Ok(index) = u8::try_from(index) {
                fb.color_map_mut().set_entry(index, red, green, blue);
            }
        }
        Ok(())
    }

    async fn handle_server_cut_text(&mut self) -> Result<()> {
        self.stream.read_padding(3).await?;
        let length = self.stream.read_u32().await? as usize;
        if length > MAX_CUT_TEXT {
            return Err(VncError::Protocol(format!(
                "server cut text of {length} bytes exceeds the {MAX_CUT_TEXT} byte cap"
            )));
        }
        let bytes = self.stream.read_bytes(length).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let _ = self.events.send(SessionEvent::ServerCutText { text });
        Ok(())
    }
}
