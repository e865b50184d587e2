//! High-level device interface

use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use miio_core::constants::{error_codes, methods, RETRY_ID_STRIDE};
use miio_core::{DeviceErrorObject, Frame, Header, Reply, Request, Response, Session, Token};
use miio_transport::{Transport, UdpTransport};
use miio_types::{DeviceInfo, FromReply};

use crate::config::DeviceConfig;
use crate::discovery::handshake_exchange;
use crate::error::{Error, Result};

/// Per-call options for [`Device::send_with`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendOptions {
    /// Overrides the configured retry count
    pub retry_count: Option<usize>,

    /// Extra top-level request fields
    pub extra: Map<String, Value>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    /// Add an extra top-level field, e.g. a sub-device id
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Outcome of one request attempt
enum Attempt {
    Success(Value),

    /// Device reported a transient error
    Recoverable(DeviceErrorObject),

    /// Nothing usable came back
    Transport(miio_transport::Error),

    Fatal(Error),
}

/// miIO device
///
/// High-level interface for one device: handshakes, builds encrypted
/// requests, retries and classifies errors. Every call takes `&mut self`,
/// so at most one request is in flight.
///
/// # Examples
///
/// ```no_run
/// use miio::{Device, Token};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> miio::Result<()> {
///     let token: Token = "00112233445566778899aabbccddeeff".parse()?;
///     let mut device = Device::new("192.168.1.50", token);
///
///     let power = device.send("get_prop", json!(["power"])).await?;
///     println!("power: {}", power);
///
///     let info = device.info().await?;
///     println!("Device: {}", info);
///     Ok(())
/// }
/// ```
pub struct Device {
    transport: Box<dyn Transport>,
    session: Session,
    config: DeviceConfig,
}

impl Device {
    /// Create a new device instance with default settings
    pub fn new(ip: impl Into<String>, token: Token) -> Self {
        Self::with_config(ip, token, DeviceConfig::default())
    }

    /// Create a new device instance
    pub fn with_config(ip: impl Into<String>, token: Token, config: DeviceConfig) -> Self {
        let transport = UdpTransport::new(ip, config.port);
        Self::with_transport(Box::new(transport), token, config)
    }

    /// Create a device from a 32 character hex token
    pub fn from_hex_token(ip: impl Into<String>, token: &str) -> Result<Self> {
        Ok(Self::new(ip, Token::from_hex(token)?))
    }

    /// Create a device over a custom transport
    pub fn with_transport(transport: Box<dyn Transport>, token: Token, config: DeviceConfig) -> Self {
        Self {
            transport,
            session: Session::new(token),
            config,
        }
    }

    /// Set receive timeout
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set default retry count
    pub fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.config.retry_count = retry_count;
        self
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn token(&self) -> &Token {
        self.session.token()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Check if a handshake has completed
    pub fn is_handshaken(&self) -> bool {
        self.session.is_ready()
    }

    /// Device id, once handshaken
    pub fn device_id(&self) -> Option<u32> {
        self.session.device_id().ok()
    }

    /// Handshake with the device
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceUnreachable`] if no attempt gets a reply.
    pub async fn send_handshake(&mut self) -> Result<Header> {
        let attempts = self.config.handshake_attempts.max(1);

        for attempt in 1..=attempts {
            match handshake_exchange(self.transport.as_mut(), self.config.timeout).await {
                Ok(header) => {
                    self.session.establish(header.device_id, header.timestamp);

                    info!(
                        "Handshake with {} complete (device_id=0x{:08X}, ts={})",
                        self.transport.remote_addr(),
                        header.device_id,
                        header.timestamp
                    );

                    return Ok(header);
                }
                Err(e) => {
                    warn!(
                        "Handshake attempt {}/{} with {} failed: {}",
                        attempt,
                        attempts,
                        self.transport.remote_addr(),
                        e
                    );
                }
            }
        }

        self.session.invalidate();

        Err(Error::DeviceUnreachable {
            addr: self.transport.remote_addr(),
            attempts,
        })
    }

    /// Send a command with default options
    pub async fn send(&mut self, command: &str, params: Value) -> Result<Value> {
        self.send_with(command, params, &SendOptions::default()).await
    }

    /// Send a command without any typed interpretation
    pub async fn raw_command(&mut self, command: &str, params: Value) -> Result<Value> {
        self.send(command, params).await
    }

    /// Send a command and convert the reply
    pub async fn send_typed<T: FromReply>(&mut self, command: &str, params: Value) -> Result<T> {
        let value = self.send(command, params).await?;
        Ok(T::from_reply(value)?)
    }

    /// Send a command
    ///
    /// Returns the `result` field of the reply, or the whole body when the
    /// device omits the wrapper.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceUnreachable`] if the handshake fails
    /// - [`Error::NoResponse`] once transport retries are exhausted
    /// - [`Error::InvalidToken`] if the reply checksum does not match
    /// - [`Error::Device`] if the device rejects the request
    pub async fn send_with(
        &mut self,
        command: &str,
        params: Value,
        options: &SendOptions,
    ) -> Result<Value> {
        let mut retries_left = options.retry_count.unwrap_or(self.config.retry_count);
        let mut handshake = !self.session.is_ready() || !self.config.lazy_discover;
        let mut attempts = 0;

        loop {
            if handshake || !self.session.is_ready() {
                self.send_handshake().await?;
            }

            let request = Request::new(self.session.next_id(), command, params.clone())
                .with_extra(options.extra.clone());

            attempts += 1;

            match self.attempt(&request).await {
                Attempt::Success(value) => {
                    trace!("{} <- {}", self.transport.remote_addr(), value);
                    return Ok(value);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Recoverable(error) => {
                    if retries_left == 0 {
                        return Err(Error::Device {
                            code: error.code,
                            message: error.message,
                        });
                    }

                    retries_left -= 1;
                    handshake = false;

                    warn!(
                        "Recoverable error for {}: {}, retrying ({} left)",
                        request.method, error, retries_left
                    );
                }
                Attempt::Transport(e) => {
                    if retries_left == 0 {
                        return Err(Error::NoResponse {
                            attempts,
                            source: e,
                        });
                    }

                    retries_left -= 1;
                    handshake = true;
                    self.session.skip_ids(RETRY_ID_STRIDE);
                    self.session.invalidate();

                    warn!(
                        "No reply for {} from {}: {}, retrying ({} left)",
                        request.method,
                        self.transport.remote_addr(),
                        e,
                        retries_left
                    );
                }
            }
        }
    }

    /// Get device information
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceInfoUnavailable`] when the reply cannot be
    /// decoded or does not look like `miIO.info` output.
    pub async fn info(&mut self) -> Result<DeviceInfo> {
        debug!("Getting device info...");

        let value = match self.send(methods::INFO, Value::Array(Vec::new())).await {
            Ok(value) => value,
            Err(Error::Core(e)) => {
                return Err(Error::DeviceInfoUnavailable(format!(
                    "unable to decode miIO.info reply: {}",
                    e
                )));
            }
            Err(e) => return Err(e),
        };

        let info = DeviceInfo::from_reply(value)
            .map_err(|e| Error::DeviceInfoUnavailable(e.to_string()))?;

        debug!("Device info: {}", info);

        Ok(info)
    }

    /// Request properties, `max_properties` at a time (all at once if `None`)
    ///
    /// Values are concatenated in request order.
    pub async fn get_properties(
        &mut self,
        properties: &[Value],
        property_getter: Option<&str>,
        max_properties: Option<usize>,
    ) -> Result<Vec<Value>> {
        let getter = property_getter.unwrap_or(methods::GET_PROP);
        let chunk_size = max_properties.filter(|n| *n > 0).unwrap_or(properties.len().max(1));

        let mut values = Vec::with_capacity(properties.len());

        for chunk in properties.chunks(chunk_size) {
            match self.send(getter, Value::Array(chunk.to_vec())).await? {
                Value::Array(chunk_values) => values.extend(chunk_values),
                other => {
                    return Err(Error::InvalidResponse(format!(
                        "{} returned a non-list value: {}",
                        getter, other
                    )));
                }
            }
        }

        if values.len() != properties.len() {
            debug!(
                "Count ({}) of requested properties does not match the count ({}) of received values",
                properties.len(),
                values.len()
            );
        }

        Ok(values)
    }

    // Helper methods

    async fn attempt(&mut self, request: &Request) -> Attempt {
        let device_id = match self.session.device_id() {
            Ok(id) => id,
            Err(e) => return Attempt::Fatal(e.into()),
        };

        let frame = match Frame::encode(
            request,
            device_id,
            self.session.next_timestamp(),
            self.session.token(),
        ) {
            Ok(frame) => frame,
            Err(e) => return Attempt::Fatal(e.into()),
        };

        debug!("{} -> {}", self.transport.remote_addr(), request);

        let reply = match self.transport.exchange(&frame, self.config.timeout).await {
            Ok(reply) => reply,
            Err(e) => return Attempt::Transport(e),
        };

        let reply = match Frame::decode(&reply, self.session.token()) {
            Ok(reply) => reply,
            Err(e) if e.is_integrity_failure() => {
                return Attempt::Fatal(Error::InvalidToken {
                    addr: self.transport.remote_addr(),
                });
            }
            Err(e) => return Attempt::Fatal(e.into()),
        };

        let Some(body) = reply.body else {
            return Attempt::Fatal(Error::InvalidResponse(format!(
                "handshake reply to {}",
                request.method
            )));
        };

        let response = match Response::from_value(body) {
            Ok(response) => response,
            Err(e) => return Attempt::Fatal(e.into()),
        };

        self.session.observe_reply(reply.header.timestamp, response.id);

        match response.reply {
            Reply::Result(value) => Attempt::Success(value),
            Reply::Error(error) if error_codes::is_recoverable(error.code) => {
                Attempt::Recoverable(error)
            }
            Reply::Error(error) => Attempt::Fatal(Error::Device {
                code: error.code,
                message: error.message,
            }),
        }
    }
}
