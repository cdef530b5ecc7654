//! GPIO control through the bit-band alias of the port registers.

use super::registers::*;
use super::Kinetis;
use crate::probe::ArmProbe;
use crate::Error;

/// A GPIO pin.
///
/// The raw value is the offset of the pin's PCR register from PORTA_PCR0:
/// `port << 12 | bit << 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin(u32);

impl Pin {
    /// I2C0 SCL on the Teensy 3 pinout.
    pub const PTB0: Pin = Pin::new(1, 0);
    /// I2C0 SDA on the Teensy 3 pinout.
    pub const PTB1: Pin = Pin::new(1, 1);
    /// The LED on the Teensy 3 board.
    pub const PTC5: Pin = Pin::new(2, 5);

    /// Pin `bit` of port `port`, with port A being 0.
    pub const fn new(port: u32, bit: u32) -> Self {
        Self(port << 12 | (bit & 31) << 2)
    }

    /// Decode a raw pin value. Bits outside the port and pin fields are dropped.
    pub const fn from_raw(raw: u32) -> Self {
        Self::new(raw >> 12, (raw >> 2) & 31)
    }

    /// The raw encoding.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The port index, A = 0.
    pub const fn port(self) -> u32 {
        self.0 >> 12
    }

    /// The bit within the port.
    pub const fn bit(self) -> u32 {
        (self.0 >> 2) & 31
    }

    /// Address of the pin control register.
    pub const fn pcr_address(self) -> u32 {
        PORTA_PCR0 + self.0
    }
}

/// Pin configuration, following the Arduino `pinMode` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Input without pull resistor.
    Input,
    /// Push-pull output.
    Output,
    /// Input with the pull-up enabled.
    InputPullup,
    /// Any other mode number. Configuring it is ignored.
    Unsupported(u8),
}

impl From<u8> for PinMode {
    fn from(value: u8) -> Self {
        match value {
            0 => PinMode::Input,
            1 => PinMode::Output,
            2 => PinMode::InputPullup,
            other => PinMode::Unsupported(other),
        }
    }
}

/// The bit-band alias word for `bit` of the peripheral register at `address`.
///
/// `address` must lie in the peripheral bit-band region starting at 0x4000_0000.
pub const fn bitband_alias(address: u32, bit: u32) -> u32 {
    address
        .wrapping_sub(BITBAND_REGION_BASE)
        .wrapping_mul(32)
        .wrapping_add(bit * 4)
        .wrapping_add(BITBAND_ALIAS_BASE)
}

/// Register `base` (of port A) for `port`.
const fn port_register(base: u32, port: u32) -> u32 {
    base + port * GPIO_PORT_STRIDE
}

impl<P: ArmProbe> Kinetis<P> {
    /// Configure `pin` as GPIO in the given mode.
    ///
    /// An [`PinMode::Unsupported`] mode is logged and otherwise ignored.
    pub fn pin_mode(&mut self, pin: Pin, mode: PinMode) -> Result<(), Error> {
        let mut pcr = port_pcr_mux(1) | PORT_PCR_DSE | PORT_PCR_SRE;

        match mode {
            PinMode::InputPullup => pcr |= PORT_PCR_PE | PORT_PCR_PS,
            PinMode::Input | PinMode::Output => {}
            PinMode::Unsupported(raw) => {
                tracing::error!("GPIO: Unsupported pinMode {}", raw);
                return Ok(());
            }
        }

        self.probe.write_word_32(pin.pcr_address(), pcr)?;

        let direction = port_register(GPIOA_PDDR, pin.port());
        self.mem_store_bit(direction, pin.bit(), mode == PinMode::Output)
    }

    /// Drive an output pin.
    pub fn digital_write(&mut self, pin: Pin, high: bool) -> Result<(), Error> {
        self.mem_store_bit(port_register(GPIOA_PDOR, pin.port()), pin.bit(), high)
    }

    /// Sample a pin.
    pub fn digital_read(&mut self, pin: Pin) -> Result<bool, Error> {
        self.mem_load_bit(port_register(GPIOA_PDIR, pin.port()), pin.bit())
    }

    /// Set all outputs of `port` (A = 0) at once.
    ///
    /// `port` is a plain port index, not a pin encoding. For a [`Pin`] use
    /// [`Pin::port`], e.g. `digital_write_port(Pin::PTC5.port(), value)`.
    pub fn digital_write_port(&mut self, port: u32, value: u32) -> Result<(), Error> {
        self.probe
            .write_word_32(port_register(GPIOA_PDOR, port), value)?;
        Ok(())
    }

    /// Write a single bit of a peripheral register through its bit-band alias.
    pub fn mem_store_bit(&mut self, address: u32, bit: u32, value: bool) -> Result<(), Error> {
        self.probe
            .write_word_32(bitband_alias(address, bit), value.into())?;
        Ok(())
    }

    /// Read a single bit of a peripheral register through its bit-band alias.
    pub fn mem_load_bit(&mut self, address: u32, bit: u32) -> Result<bool, Error> {
        let value = self.probe.read_word_32(bitband_alias(address, bit))?;
        Ok(value & 1 != 0)
    }
}

#[cfg(test)]
mod test {
    use super::{bitband_alias, Pin, PinMode};
    use crate::kinetis::registers::*;
    use crate::kinetis::Kinetis;
    use crate::probe::mock::MockKinetis;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const PORTC: u32 = 2 * GPIO_PORT_STRIDE;

    #[test_case(Pin::PTB0, 1, 0, PORTB_PCR0; "PTB0")]
    #[test_case(Pin::PTB1, 1, 1, PORTB_PCR1; "PTB1")]
    #[test_case(Pin::new(0, 31), 0, 31, PORTA_PCR0 + 0x7c; "PTA31")]
    #[test_case(Pin::new(4, 26), 4, 26, PORTA_PCR0 + 0x4068; "PTE26")]
    fn pin_encoding(pin: Pin, port: u32, bit: u32, pcr: u32) {
        assert_eq!(pin.port(), port);
        assert_eq!(pin.bit(), bit);
        assert_eq!(pin.pcr_address(), pcr);
        assert_eq!(Pin::from_raw(pin.raw()), pin);
    }

    #[test]
    fn raw_pins_compare_by_port_and_bit() {
        assert_eq!(Pin::from_raw(0x2016), Pin::PTC5);
    }

    #[test_case(0, PinMode::Input)]
    #[test_case(1, PinMode::Output)]
    #[test_case(2, PinMode::InputPullup)]
    #[test_case(7, PinMode::Unsupported(7))]
    fn pin_mode_from_arduino_constant(value: u8, mode: PinMode) {
        assert_eq!(PinMode::from(value), mode);
    }

    #[test]
    fn bitband_transform() {
        assert_eq!(bitband_alias(GPIOA_PDOR + 0x40, 17), 0x43fe_0844);
        assert_eq!(bitband_alias(BITBAND_REGION_BASE, 0), BITBAND_ALIAS_BASE);
    }

    #[test_case(PinMode::Output, 0x144, true; "output")]
    #[test_case(PinMode::Input, 0x144, false; "input")]
    #[test_case(PinMode::InputPullup, 0x147, false; "input with pullup")]
    fn pin_mode_configures_pcr_and_direction(mode: PinMode, pcr: u32, output: bool) {
        let mut mock = MockKinetis::new();
        mock.poke_32(GPIOA_PDDR + PORTC, 0x0000_0001);
        let mut target = Kinetis::new(mock);

        target.pin_mode(Pin::PTC5, mode).unwrap();

        let mock = target.probe();
        assert_eq!(mock.writes_to(Pin::PTC5.pcr_address()), [pcr]);
        let expected_direction = if output { 0x21 } else { 0x01 };
        assert_eq!(mock.peek_32(GPIOA_PDDR + PORTC), expected_direction);
    }

    #[test]
    fn unsupported_mode_touches_nothing() {
        let mut target = Kinetis::new(MockKinetis::new());

        target.pin_mode(Pin::PTC5, PinMode::from(9)).unwrap();

        assert!(target.probe().operations().is_empty());
    }

    #[test]
    fn write_and_read_single_pins() {
        let mut mock = MockKinetis::new();
        mock.poke_32(GPIOA_PDIR + PORTC, 1 << 5);
        let mut target = Kinetis::new(mock);

        target.digital_write(Pin::PTC5, true).unwrap();
        target.digital_write(Pin::new(2, 9), true).unwrap();
        target.digital_write(Pin::PTC5, false).unwrap();

        assert_eq!(target.probe().peek_32(GPIOA_PDOR + PORTC), 1 << 9);
        assert!(target.digital_read(Pin::PTC5).unwrap());
        assert!(!target.digital_read(Pin::new(2, 6)).unwrap());
    }

    #[test]
    fn write_whole_port() {
        let mut target = Kinetis::new(MockKinetis::new());

        target.digital_write_port(2, 0x0000_dead).unwrap();
        target
            .digital_write_port(Pin::PTC5.port(), 0x0000_beef)
            .unwrap();

        assert_eq!(
            target.probe().writes_to(GPIOA_PDOR + PORTC),
            [0xdead, 0xbeef]
        );
    }
}
