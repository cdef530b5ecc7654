//! Master mode driver for the I2C0 controller, in the style of the Arduino `Wire` API.
//!
//! All register traffic is reported on the `kinetis_swd::i2c` tracing target at trace
//! level, as long as the probe's [`LogLevel`] is [`LogLevel::I2c`].

use super::registers::*;
use super::{Kinetis, Pin};
use crate::probe::{ArmProbe, LogLevel};
use crate::{Error, MemoryMappedRegister, WaitPhase};

/// Where the I2C0 master is within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum I2cState {
    /// Configured, no transaction started.
    #[default]
    Idle,
    /// A start or repeated start was issued, the address byte comes next.
    Addressing,
    /// Sending data bytes to the slave.
    Transmitting,
    /// Receiving the bytes requested by [`I2c::request_from`].
    Receiving,
    /// A stop was issued.
    Stopped,
}

/// Session-side state of the running transaction.
#[derive(Debug, Default)]
pub(crate) struct I2cTransaction {
    /// Bytes still to be read, counting the one already clocked in ahead.
    remaining: u32,
    state: I2cState,
}

/// Errors specific to the I2C master.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum I2cError {
    /// No received data is pending. Call `request_from` first.
    NoDataPending,
}

/// Handle to the I2C0 master of a [`Kinetis`] session.
///
/// Created by [`Kinetis::i2c0`]. The transaction state lives in the session, so a
/// handle may be dropped and recreated in the middle of a transfer.
#[derive(Debug)]
pub struct I2c<'a, P> {
    target: &'a mut Kinetis<P>,
}

impl<P: ArmProbe> Kinetis<P> {
    /// The I2C0 master.
    pub fn i2c0(&mut self) -> I2c<'_, P> {
        I2c { target: self }
    }
}

impl<P: ArmProbe> I2c<'_, P> {
    /// Enable the controller and route SCL and SDA to PTB0 and PTB1.
    ///
    /// The clock gate for I2C0 is opened by [`Kinetis::peripheral_init`].
    pub fn begin(&mut self) -> Result<(), Error> {
        let divider = self.target.config.i2c_frequency_divider;
        self.write_register(I2C0_F, divider)?;

        let mut c1 = I2cC1(0);
        c1.set_iicen(true);
        self.write_register(I2cC1::ADDRESS, c1.into())?;

        for pin in [Pin::PTB0, Pin::PTB1] {
            self.target
                .probe
                .write_word_32(pin.pcr_address(), port_pcr_mux(2))?;
        }

        self.target.i2c = I2cTransaction::default();
        Ok(())
    }

    /// Issue a start and address the slave at 7-bit `address` for writing.
    pub fn begin_transmission(&mut self, address: u8) -> Result<(), Error> {
        let mut c1 = self.control()?;
        c1.set_tx(true);
        self.write_register(I2cC1::ADDRESS, c1.into())?;
        c1.set_mst(true);
        self.write_register(I2cC1::ADDRESS, c1.into())?;

        self.target.i2c.state = I2cState::Addressing;
        self.write(address << 1)?;
        self.target.i2c.state = I2cState::Transmitting;
        Ok(())
    }

    /// Send one byte and wait until it was clocked out.
    pub fn write(&mut self, data: u8) -> Result<(), Error> {
        self.write_register(I2C0_D, data)?;
        self.wait_for_done()
    }

    /// Finish the transmission with a stop, or with a repeated start when `stop` is false.
    pub fn end_transmission(&mut self, stop: bool) -> Result<(), Error> {
        let mut c1 = self.control()?;

        if !stop {
            c1.set_rsta(true);
            self.write_register(I2cC1::ADDRESS, c1.into())?;
            self.target.i2c.state = I2cState::Addressing;
            return Ok(());
        }

        c1.set_mst(false);
        self.write_register(I2cC1::ADDRESS, c1.into())?;
        c1.set_tx(false);
        self.write_register(I2cC1::ADDRESS, c1.into())?;

        self.wait_status(|status| !status.busy(), WaitPhase::I2cBusIdle)?;
        self.target.i2c.state = I2cState::Stopped;
        Ok(())
    }

    /// Address the slave at 7-bit `address` for reading and start receiving `length` bytes.
    ///
    /// Must follow a [`I2c::begin_transmission`], usually with an
    /// [`I2c::end_transmission`] issuing a repeated start in between. The received
    /// bytes are fetched with [`I2c::receive`].
    pub fn request_from(&mut self, address: u8, length: u8) -> Result<(), Error> {
        self.write(address << 1 | 1)?;

        let mut c1 = self.control()?;
        c1.set_tx(false);
        self.write_register(I2cC1::ADDRESS, c1.into())?;

        self.target.i2c.state = I2cState::Receiving;
        self.target.i2c.remaining = u32::from(length) + 1;

        // Reading D starts the transfer of the first byte. The value itself is stale.
        self.receive()?;
        Ok(())
    }

    /// Take the next received byte.
    ///
    /// The last byte is not acknowledged, and the stop is issued before it is read.
    pub fn receive(&mut self) -> Result<u8, Error> {
        let remaining = self.target.i2c.remaining;
        if remaining == 0 {
            return Err(I2cError::NoDataPending.into());
        }

        if remaining <= 2 {
            let mut c1 = self.control()?;
            c1.set_txak(true);
            self.write_register(I2cC1::ADDRESS, c1.into())?;
        }

        if remaining == 1 {
            self.end_transmission(true)?;
            let mut c1 = self.control()?;
            c1.set_txak(false);
            self.write_register(I2cC1::ADDRESS, c1.into())?;
        }

        let data = self.read_register(I2C0_D)?;

        if remaining > 1 {
            self.wait_for_done()?;
        }

        self.target.i2c.remaining = remaining - 1;
        Ok(data)
    }

    /// Whether [`I2c::receive`] has data left.
    pub fn available(&self) -> bool {
        self.target.i2c.remaining > 0
    }

    /// Bytes left to receive.
    pub fn remaining(&self) -> u32 {
        self.target.i2c.remaining
    }

    /// The current transaction state.
    pub fn state(&self) -> I2cState {
        self.target.i2c.state
    }

    fn control(&mut self) -> Result<I2cC1, Error> {
        self.read_register(I2cC1::ADDRESS).map(I2cC1)
    }

    /// Wait for the transfer complete interrupt flag and acknowledge it.
    fn wait_for_done(&mut self) -> Result<(), Error> {
        self.wait_status(I2cS::iicif, WaitPhase::I2cTransfer)?;

        let mut ack = I2cS(0);
        ack.set_iicif(true);
        self.write_register(I2cS::ADDRESS, ack.into())
    }

    /// Poll the status register every poll interval until `done` holds or the
    /// timeout elapses.
    fn wait_status(
        &mut self,
        done: impl Fn(&I2cS) -> bool,
        phase: WaitPhase,
    ) -> Result<I2cS, Error> {
        let interval = self.target.config.i2c_poll_interval_ms;
        let timeout = self.target.config.i2c_timeout_ms;
        let mut waited = 0;

        loop {
            let status = I2cS(self.read_register(I2cS::ADDRESS)?);
            if done(&status) {
                return Ok(status);
            }

            self.target.probe.delay_ms(interval);
            waited += interval;
            if waited > timeout {
                tracing::error!("I2C: Timed out waiting for {} after {} ms", phase, waited);
                return Err(Error::Timeout(phase));
            }
        }
    }

    fn read_register(&mut self, address: u32) -> Result<u8, Error> {
        let value = self.target.probe.read_word_8(address)?;
        if self.verbose() {
            tracing::trace!(target: "kinetis_swd::i2c", "read  {:#010x} = {:#04x}", address, value);
        }
        Ok(value)
    }

    fn write_register(&mut self, address: u32, value: u8) -> Result<(), Error> {
        if self.verbose() {
            tracing::trace!(target: "kinetis_swd::i2c", "write {:#010x} = {:#04x}", address, value);
        }
        self.target.probe.write_word_8(address, value)?;
        Ok(())
    }

    fn verbose(&self) -> bool {
        self.target.probe.log_level() >= LogLevel::I2c
    }
}

#[cfg(test)]
mod test {
    use super::{I2cError, I2cState};
    use crate::kinetis::registers::*;
    use crate::kinetis::Kinetis;
    use crate::probe::mock::{MockKinetis, Operation};
    use crate::{Error, MemoryMappedRegister, WaitPhase};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn delays(target: &Kinetis<MockKinetis>) -> Vec<u32> {
        target
            .probe()
            .operations()
            .iter()
            .filter_map(|operation| match operation {
                Operation::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn begin_configures_controller_and_pins() {
        let mut target = Kinetis::new(MockKinetis::new());

        target.i2c0().begin().unwrap();

        let mock = target.probe();
        assert_eq!(mock.writes_to(I2C0_F), [u32::from(I2C_F_100KHZ)]);
        assert_eq!(mock.writes_to(I2cC1::ADDRESS), [0x80]);
        assert_eq!(mock.writes_to(PORTB_PCR0), [0x200]);
        assert_eq!(mock.writes_to(PORTB_PCR1), [0x200]);
    }

    #[test]
    fn register_write() {
        let mut target = Kinetis::new(MockKinetis::new());
        let mut i2c = target.i2c0();
        i2c.begin().unwrap();

        i2c.begin_transmission(0x50).unwrap();
        assert_eq!(i2c.state(), I2cState::Transmitting);
        i2c.write(0x00).unwrap();
        i2c.write(0x42).unwrap();
        i2c.end_transmission(true).unwrap();
        assert_eq!(i2c.state(), I2cState::Stopped);

        let mock = target.probe();
        assert_eq!(mock.i2c_written(), [0xa0, 0x00, 0x42]);
        assert_eq!(mock.i2c_starts(), 1);
        assert_eq!(mock.i2c_stops(), 1);
        // Every byte acknowledges the interrupt flag.
        assert_eq!(mock.writes_to(I2cS::ADDRESS), [0x02, 0x02, 0x02]);
    }

    #[test_case(1, &[false]; "single byte")]
    #[test_case(2, &[true, false]; "two bytes")]
    #[test_case(3, &[true, true, false]; "three bytes")]
    fn register_read(length: u8, acks: &[bool]) {
        let mut mock = MockKinetis::new();
        mock.i2c_queue_rx(&[0x11, 0x22, 0x33]);
        let mut target = Kinetis::new(mock);
        let mut i2c = target.i2c0();
        i2c.begin().unwrap();

        i2c.begin_transmission(0x50).unwrap();
        i2c.write(0x10).unwrap();
        i2c.end_transmission(false).unwrap();
        assert_eq!(i2c.state(), I2cState::Addressing);
        i2c.request_from(0x50, length).unwrap();

        let mut received = Vec::new();
        while i2c.available() {
            assert_eq!(i2c.remaining(), u32::from(length) - received.len() as u32);
            received.push(i2c.receive().unwrap());
        }

        assert_eq!(received, [0x11u8, 0x22, 0x33][..length as usize]);
        assert_eq!(i2c.state(), I2cState::Stopped);

        let mock = target.probe();
        assert_eq!(mock.i2c_written(), [0xa0, 0x10, 0xa1]);
        assert_eq!(mock.i2c_acks(), acks);
        assert_eq!(mock.i2c_repeated_starts(), 1);
        assert_eq!(mock.i2c_stops(), 1);

        // The stop goes out between the last two reads of the data register.
        let operations = mock.operations();
        let data_reads: Vec<usize> = operations
            .iter()
            .enumerate()
            .filter(|(_, op)| matches!(op, Operation::Read { address, .. } if *address == I2C0_D))
            .map(|(index, _)| index)
            .collect();
        let control_write = |op: &Operation, master: bool| {
            matches!(op, Operation::Write { address, value, .. }
                if *address == I2cC1::ADDRESS && I2cC1(*value as u8).mst() == master)
        };
        let master = operations
            .iter()
            .position(|op| control_write(op, true))
            .unwrap();
        let stop = master
            + operations[master..]
                .iter()
                .position(|op| control_write(op, false))
                .unwrap();

        assert_eq!(data_reads.len(), usize::from(length) + 1);
        assert!(data_reads[data_reads.len() - 2] < stop);
        assert!(stop < data_reads[data_reads.len() - 1]);
    }

    #[test]
    fn longest_request_is_counted_in_full() {
        let mut target = Kinetis::new(MockKinetis::new());
        let mut i2c = target.i2c0();
        i2c.begin().unwrap();
        i2c.begin_transmission(0x50).unwrap();
        i2c.end_transmission(false).unwrap();

        i2c.request_from(0x50, u8::MAX).unwrap();

        assert_eq!(i2c.remaining(), 255);
        assert!(i2c.available());
        assert_eq!(i2c.state(), I2cState::Receiving);
    }

    #[test]
    fn receive_without_request() {
        let mut target = Kinetis::new(MockKinetis::new());
        let mut i2c = target.i2c0();

        assert!(!i2c.available());
        assert!(matches!(
            i2c.receive(),
            Err(Error::I2c(I2cError::NoDataPending))
        ));
    }

    #[test]
    fn stalled_transfer_times_out() {
        let mut mock = MockKinetis::new();
        mock.i2c_stalled = true;
        let mut target = Kinetis::new(mock);
        let mut i2c = target.i2c0();
        i2c.begin().unwrap();

        let result = i2c.begin_transmission(0x50);

        assert!(matches!(
            result,
            Err(Error::Timeout(WaitPhase::I2cTransfer))
        ));
        // 500 ms budget, polled every 10 ms.
        assert_eq!(delays(&target), vec![10; 51]);
    }

    #[test]
    fn stuck_bus_times_out_on_stop() {
        let mut mock = MockKinetis::new();
        mock.i2c_bus_stuck = true;
        let mut target = Kinetis::new(mock);
        let mut i2c = target.i2c0();
        i2c.begin().unwrap();
        i2c.begin_transmission(0x50).unwrap();

        let result = i2c.end_transmission(true);

        assert!(matches!(
            result,
            Err(Error::Timeout(WaitPhase::I2cBusIdle))
        ));
    }

    #[test]
    fn timeout_follows_config() {
        let mut mock = MockKinetis::new();
        mock.i2c_stalled = true;
        let config = crate::KinetisConfig {
            i2c_timeout_ms: 20,
            i2c_poll_interval_ms: 5,
            ..Default::default()
        };
        let mut target = Kinetis::with_config(mock, config);
        let mut i2c = target.i2c0();
        i2c.begin().unwrap();

        assert!(i2c.begin_transmission(0x50).unwrap_err().is_timeout());
        assert_eq!(delays(&target), vec![5; 5]);
    }
}
