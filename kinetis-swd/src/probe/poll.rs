use super::{ApAddress, ArmError, DapAccess, MemoryInterface};

/// The value a polled register has to show under its mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Every bit of the mask must be set.
    AllSet,
    /// The masked value must equal the pattern. `Pattern(0)` waits for all masked bits to clear.
    Pattern(u32),
}

/// A bounded wait on one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCondition {
    /// The bits of the register that are compared.
    pub mask: u32,
    /// What the masked bits have to look like.
    pub expected: Expected,
    /// How often the register is read at most.
    pub retries: u32,
}

/// Result of a poll which did not fail on the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polled {
    /// The last value read from the register.
    pub value: u32,
    /// Whether `value` satisfied the condition.
    pub matched: bool,
    /// How many reads were performed.
    pub attempts: u32,
}

impl PollCondition {
    /// Wait until all bits of `mask` are set.
    pub const fn all_set(mask: u32, retries: u32) -> Self {
        Self {
            mask,
            expected: Expected::AllSet,
            retries,
        }
    }

    /// Wait until all bits of `mask` are clear.
    pub const fn all_clear(mask: u32, retries: u32) -> Self {
        Self::pattern(mask, 0, retries)
    }

    /// Wait until the bits of `mask` equal `pattern`.
    pub const fn pattern(mask: u32, pattern: u32, retries: u32) -> Self {
        Self {
            mask,
            expected: Expected::Pattern(pattern),
            retries,
        }
    }

    /// Checks a single register value against the condition.
    pub fn matches(&self, value: u32) -> bool {
        let expected = match self.expected {
            Expected::AllSet => self.mask,
            Expected::Pattern(pattern) => pattern,
        };
        value & self.mask == expected
    }

    /// Calls `read` until the value matches or the retry budget is used up.
    ///
    /// `read` is called at most `retries` times. Transport errors end the poll
    /// immediately.
    pub fn poll<E>(&self, mut read: impl FnMut() -> Result<u32, E>) -> Result<Polled, E> {
        let mut polled = Polled {
            value: 0,
            matched: false,
            attempts: 0,
        };

        while polled.attempts < self.retries {
            polled.value = read()?;
            polled.attempts += 1;

            if self.matches(polled.value) {
                polled.matched = true;
                break;
            }
        }

        Ok(polled)
    }
}

/// Polling helpers for every probe.
pub trait Poll {
    /// Poll an access port register.
    fn poll_ap_register(
        &mut self,
        ap: ApAddress,
        register: u8,
        condition: PollCondition,
    ) -> Result<Polled, ArmError>;

    /// Poll a 32-bit memory mapped register.
    fn poll_word_32(&mut self, address: u32, condition: PollCondition)
        -> Result<Polled, ArmError>;

    /// Poll an 8-bit memory mapped register.
    fn poll_word_8(&mut self, address: u32, condition: PollCondition) -> Result<Polled, ArmError>;
}

impl<T> Poll for T
where
    T: DapAccess + MemoryInterface + ?Sized,
{
    fn poll_ap_register(
        &mut self,
        ap: ApAddress,
        register: u8,
        condition: PollCondition,
    ) -> Result<Polled, ArmError> {
        condition.poll(|| self.read_raw_ap_register(ap, register))
    }

    fn poll_word_32(
        &mut self,
        address: u32,
        condition: PollCondition,
    ) -> Result<Polled, ArmError> {
        condition.poll(|| self.read_word_32(address))
    }

    fn poll_word_8(&mut self, address: u32, condition: PollCondition) -> Result<Polled, ArmError> {
        condition.poll(|| self.read_word_8(address).map(u32::from))
    }
}

#[cfg(test)]
mod test {
    use super::{Expected, PollCondition};
    use test_case::test_case;

    #[test_case(0b1010, Expected::Pattern(0b1000), 0b1110, true; "pattern matches under mask")]
    #[test_case(0b1010, Expected::Pattern(0b1000), 0b0010, false; "pattern differs under mask")]
    #[test_case(0b0110, Expected::Pattern(0), 0b1001, true; "all clear")]
    #[test_case(0b0110, Expected::Pattern(0), 0b0100, false; "one bit still set")]
    #[test_case(0b0110, Expected::AllSet, 0b1111, true; "all set")]
    #[test_case(0b0110, Expected::AllSet, 0b0010, false; "only some set")]
    #[test_case(0, Expected::AllSet, 0xdead_beef, true; "empty mask always matches")]
    fn condition_matches(mask: u32, expected: Expected, actual: u32, matches: bool) {
        let condition = PollCondition {
            mask,
            expected,
            retries: 1,
        };

        assert_eq!(condition.matches(actual), matches);
    }

    #[test]
    fn all_set_is_mask_compare() {
        for mask in [0x1u32, 0x30, 0x8000_0001, 0xffff_ffff] {
            let condition = PollCondition::all_set(mask, 1);
            for actual in [0u32, mask, !mask, 0xffff_ffff, mask >> 1] {
                assert_eq!(condition.matches(actual), actual & mask == mask);
            }
        }
    }

    /// Returns a reader which reports a match on read number `match_on` (1-based).
    fn reader(match_on: u32, reads: &mut u32) -> impl FnMut() -> Result<u32, ()> + '_ {
        move || {
            *reads += 1;
            Ok(if *reads == match_on { 0x8 } else { 0x0 })
        }
    }

    #[test]
    fn match_on_last_allowed_read_succeeds() {
        let condition = PollCondition::all_set(0x8, 5);
        let mut reads = 0;

        let polled = condition.poll(reader(5, &mut reads)).unwrap();

        assert!(polled.matched);
        assert_eq!(polled.attempts, 5);
        assert_eq!(reads, 5);
    }

    #[test]
    fn match_after_budget_fails() {
        let condition = PollCondition::all_set(0x8, 5);
        let mut reads = 0;

        let polled = condition.poll(reader(6, &mut reads)).unwrap();

        assert!(!polled.matched);
        assert_eq!(polled.attempts, 5);
        assert_eq!(reads, 5);
    }

    #[test]
    fn stops_reading_after_match() {
        let condition = PollCondition::all_set(0x8, 50);
        let mut reads = 0;

        let polled = condition.poll(reader(2, &mut reads)).unwrap();

        assert!(polled.matched);
        assert_eq!(reads, 2);
        assert_eq!(polled.value, 0x8);
    }

    #[test]
    fn zero_budget_never_reads() {
        let condition = PollCondition::all_clear(0x1, 0);
        let mut reads = 0;

        let polled = condition.poll(reader(1, &mut reads)).unwrap();

        assert!(!polled.matched);
        assert_eq!(reads, 0);
    }

    #[test]
    fn transport_error_ends_poll() {
        let condition = PollCondition::all_set(0x1, 10);
        let mut reads = 0;

        let result = condition.poll(|| {
            reads += 1;
            if reads == 3 {
                Err("transfer failed")
            } else {
                Ok(0)
            }
        });

        assert_eq!(result, Err("transfer failed"));
        assert_eq!(reads, 3);
    }
}
