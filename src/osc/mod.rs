// OSC module - mute control transport over UDP
//
// Sends the gate's boolean mute state as a single OSC message. The socket
// is connectionless, so a failed send never takes the pipeline down; the
// gate retries on its next tick.

use std::net::UdpSocket;

use log::info;
use rosc::{encoder, OscMessage, OscPacket, OscType};

use crate::config::NotifyConfig;
use crate::detect::{ControlSink, MuteCommand};
use crate::error::DetectorError;

/// OSC control sink sending mute state to a fixed destination.
pub struct OscSink {
    socket: UdpSocket,
    target: String,
    address: String,
}

impl OscSink {
    pub fn new(config: &NotifyConfig) -> Result<Self, DetectorError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        let target = format!("{}:{}", config.host, config.port);
        info!(
            "[Osc] Sending mute control to {} at {}",
            config.mute_address, target
        );
        Ok(Self {
            socket,
            target,
            address: config.mute_address.clone(),
        })
    }
}

impl ControlSink for OscSink {
    fn send(&mut self, command: MuteCommand) -> Result<(), DetectorError> {
        let packet = OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args: vec![OscType::Bool(command.is_mute())],
        });
        let bytes = encoder::encode(&packet).map_err(|e| DetectorError::Transport {
            reason: format!("OSC encode failed: {:?}", e),
        })?;
        self.socket.send_to(&bytes, &self.target)?;
        Ok(())
    }
}
