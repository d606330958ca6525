//! Transport abstraction for the buzzer pub/sub channels.
//!
//! The [`Transport`] trait is a bidirectional text channel: outbound JSON
//! envelopes go to the session's publish channel, inbound envelopes come from
//! the room channel (see [`ChannelNames`](crate::protocol::ChannelNames)).
//! Connecting, authenticating and attaching to channels are the realtime
//! provider's job; construct a connected transport and hand it to
//! `BuzzerClient::start`.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use buzzer_client::error::BuzzerError;
//! use buzzer_client::transport::Transport;
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), BuzzerError> {
//!         // Publish the envelope on the per-client channel
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, BuzzerError>> {
//!         // Next envelope from the room channel; None when detached
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), BuzzerError> {
//!         // Detach both channels
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::BuzzerError;

/// A bidirectional text message transport.
///
/// Each call to [`send`](Transport::send) publishes one complete JSON
/// envelope; each call to [`recv`](Transport::recv) yields one.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because the client loop
/// polls it inside `tokio::select!`. Channel-backed implementations (e.g.
/// wrapping `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Publish a JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns [`BuzzerError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), BuzzerError>;

    /// Receive the next JSON envelope.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete message was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the channel was closed cleanly
    async fn recv(&mut self) -> Option<Result<String, BuzzerError>>;

    /// Detach and release the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful close fails. Implementations should
    /// still release resources in that case.
    async fn close(&mut self) -> Result<(), BuzzerError>;
}
