// Copyright (c) 2023 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;

/// Create the WebSocket client for the Home Assistant server connection.
///
/// Creating the client is expensive and only required once per process; the client can be
/// used for multiple connections. TLS for `wss://` URLs is provided by the rustls feature
/// of the awc crate.
pub fn new_websocket_client(connection_timeout: Duration) -> awc::Client {
    awc::ClientBuilder::new()
        .timeout(connection_timeout)
        .finish()
}
