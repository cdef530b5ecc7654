use std::time::Duration;

/// Progress reporting for a [`FlashProgrammer`](super::FlashProgrammer) campaign.
///
/// This struct stores a handler closure which is called every time an event happens
/// during erase, programming or verification.
///
/// # Example
///
/// ```
/// use kinetis_swd::kinetis::FlashProgress;
///
/// // Print events
/// let progress = FlashProgress::new(|event| println!("Event: {:#?}", event));
/// ```
pub struct FlashProgress {
    handler: Box<dyn Fn(ProgressEvent)>,
}

impl Default for FlashProgress {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for FlashProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashProgress").finish_non_exhaustive()
    }
}

impl FlashProgress {
    /// Create a new `FlashProgress` structure with a given `handler` to be called on events.
    pub fn new(handler: impl Fn(ProgressEvent) + 'static) -> Self {
        Self {
            handler: Box::new(handler),
        }
    }

    /// A progress reporter which drops all events.
    pub fn empty() -> Self {
        Self::new(|_| {})
    }

    fn emit(&self, event: ProgressEvent) {
        (self.handler)(event);
    }

    pub(super) fn started_erasing(&self) {
        self.emit(ProgressEvent::StartedErasing);
    }

    pub(super) fn finished_erasing(&self, time: Duration) {
        self.emit(ProgressEvent::FinishedErasing { time });
    }

    pub(super) fn failed_erasing(&self) {
        self.emit(ProgressEvent::FailedErasing);
    }

    pub(super) fn started_programming(&self, total_longwords: u32) {
        self.emit(ProgressEvent::StartedProgramming { total_longwords });
    }

    pub(super) fn longwords_programmed(&self, count: u32, time: Duration) {
        self.emit(ProgressEvent::LongwordsProgrammed { count, time });
    }

    pub(super) fn finished_programming(&self) {
        self.emit(ProgressEvent::FinishedProgramming);
    }

    pub(super) fn failed_programming(&self) {
        self.emit(ProgressEvent::FailedProgramming);
    }

    pub(super) fn started_verifying(&self, sectors: u32) {
        self.emit(ProgressEvent::StartedVerifying { sectors });
    }

    pub(super) fn sector_verified(&self, sector: u32) {
        self.emit(ProgressEvent::SectorVerified { sector });
    }

    pub(super) fn failed_verifying(&self, sector: u32) {
        self.emit(ProgressEvent::FailedVerifying { sector });
    }

    pub(super) fn finished_verifying(&self) {
        self.emit(ProgressEvent::FinishedVerifying);
    }
}

/// Possible events during a programming campaign.
///
/// If the campaign works without problems, the events arrive in the following order:
///
/// * `StartedErasing`
/// * `FinishedErasing`
/// * `StartedProgramming`
/// * `LongwordsProgrammed` for every batch
/// * `FinishedProgramming`
/// * `StartedVerifying`
/// * `SectorVerified` for every sector
/// * `FinishedVerifying`
///
/// If an error occurs in any stage, the matching `Failed*` event is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The mass erase has started.
    StartedErasing,
    /// The mass erase and the following reset finished.
    FinishedErasing {
        /// The time the erase took.
        time: Duration,
    },
    /// The mass erase failed.
    FailedErasing,
    /// Programming of the flash has started.
    StartedProgramming {
        /// Number of longwords which will be programmed.
        total_longwords: u32,
    },
    /// A batch of longwords was staged and launched.
    LongwordsProgrammed {
        /// Number of longwords in this batch.
        count: u32,
        /// The time it took to program the batch.
        time: Duration,
    },
    /// Programming of the flash failed.
    FailedProgramming,
    /// All longwords were programmed and the target was reset.
    FinishedProgramming,
    /// Verification has started.
    StartedVerifying {
        /// Number of sectors which will be verified.
        sectors: u32,
    },
    /// A sector matched the image.
    SectorVerified {
        /// Index of the sector.
        sector: u32,
    },
    /// A sector could not be read or did not match the image.
    FailedVerifying {
        /// Index of the sector.
        sector: u32,
    },
    /// Every sector matched the image.
    FinishedVerifying,
}
