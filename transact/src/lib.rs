//! One-shot request/response exchanges with modules
//! on the actuator bus.

#![no_std]

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, ReadExactError, Write};
use frame::{Packet, FRAME_LEN};

/// Reply interval of the original fixed-wait exchange
/// discipline.
pub const REPLY_DELAY_MS: u32 = 1_000;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The port failed while the command was written.
    Write(E),
    /// The port failed or ran dry before a full reply
    /// frame was read.
    Read(ReadExactError<E>),
}

impl<E> From<ReadExactError<E>> for Error<E> {
    fn from(value: ReadExactError<E>) -> Self {
        Self::Read(value)
    }
}

/// Drives one exchange at a time over a serial port
/// shared with the module bus.
///
/// The bus is half duplex: a command goes out, then
/// the addressed module is given a fixed interval to
/// place its reply on the wire. Serializing access to
/// the underlying port across callers is not handled
/// here; `&mut self` keeps a single `Bus` to one
/// in-flight transaction.
pub struct Bus<Port, Delay>
where
    Port: Read + Write,
    Delay: DelayNs,
{
    port: Port,
    delay: Delay,
}

impl<Port, Delay> Bus<Port, Delay>
where
    Port: Read + Write,
    Delay: DelayNs,
{
    pub const fn new(port: Port, delay: Delay) -> Self {
        Self { port, delay }
    }

    /// Encode `packet` and place it on the wire.
    ///
    /// No acknowledgement is awaited.
    pub async fn send(&mut self, packet: &Packet) -> Result<(), Error<Port::Error>> {
        self.port
            .write_all(&packet.encode())
            .await
            .map_err(Error::Write)?;
        self.port.flush().await.map_err(Error::Write)
    }

    /// Send `packet`, wait `reply_delay_ms` for the
    /// module to answer, and read back one frame.
    ///
    /// The wait is a plain sleep, not a timeout tied
    /// to actual device latency. The returned packet
    /// carries its own `valid` flag; an untrustworthy
    /// reply is not an error here, but a reply shorter
    /// than a full frame is.
    pub async fn send_await_reply(
        &mut self,
        packet: &Packet,
        reply_delay_ms: u32,
    ) -> Result<Packet, Error<Port::Error>> {
        self.send(packet).await?;

        self.delay.delay_ms(reply_delay_ms).await;

        let mut raw = [0; FRAME_LEN];
        self.port.read_exact(&mut raw).await?;

        Ok(Packet::decode(&raw))
    }

    /// Release the underlying port and delay provider.
    pub fn free(self) -> (Port, Delay) {
        (self.port, self.delay)
    }
}
