// SocketCAN bus transport
use crate::application::sensors::{BusOpener, BusReceive, BusTransport, SensorError};
use crate::domain::sample::RawFrame;
use socketcan::{CanSocket, EmbeddedFrame, Frame, Socket};
use std::io::ErrorKind;
use std::time::Duration;

pub struct SocketCanOpener;

impl BusOpener for SocketCanOpener {
    fn open(&self, interface: &str) -> Result<Box<dyn BusTransport>, SensorError> {
        let socket = CanSocket::open(interface)
            .map_err(|e| SensorError::Unavailable(format!("{interface}: {e}")))?;
        tracing::debug!("Opened CAN interface {}", interface);
        Ok(Box::new(SocketCanBus {
            interface: interface.to_string(),
            socket: Some(socket),
            read_timeout: None,
        }))
    }
}

pub struct SocketCanBus {
    interface: String,
    socket: Option<CanSocket>,
    read_timeout: Option<Duration>,
}

impl BusTransport for SocketCanBus {
    fn receive(&mut self, timeout: Duration) -> BusReceive {
        let Some(socket) = self.socket.as_ref() else {
            return BusReceive::TransportError(SensorError::Unavailable(format!(
                "{} is shut down",
                self.interface
            )));
        };

        if self.read_timeout != Some(timeout) {
            if let Err(e) = socket.set_read_timeout(timeout) {
                return BusReceive::TransportError(SensorError::Transfer(format!(
                    "{}: {e}",
                    self.interface
                )));
            }
            self.read_timeout = Some(timeout);
        }

        match socket.read_frame() {
            Ok(frame) => BusReceive::Frame(RawFrame {
                id: frame.raw_id(),
                extended: frame.is_extended(),
                data: frame.data().to_vec(),
            }),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                BusReceive::Empty
            }
            Err(e) => {
                BusReceive::TransportError(SensorError::Transfer(format!("{}: {e}", self.interface)))
            }
        }
    }

    fn shutdown(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!("Closed CAN interface {}", self.interface);
        }
    }
}
