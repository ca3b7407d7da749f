// Licensed under the Apache-2.0 license

mod test_geometry;
mod test_persistence;
mod test_timing;

#[cfg(test)]
mod test {
    use emulator_periph::{
        CpuClock, DummyFlashCtrl, EmulatedFlashDriver, EmulatedTicker, FlashLayout, FlashTiming,
        PollTimeout, SectorRun, SpinLoop,
    };
    use flash_validator::{FlashValidator, ValidationReport, ValidatorConfig};
    use log::LevelFilter;
    use rand::rngs::StdRng;
    use rand::Rng;
    use simple_logger::SimpleLogger;
    use std::rc::Rc;

    pub(crate) fn init_logging() {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    pub(crate) fn driver(layout: FlashLayout) -> EmulatedFlashDriver {
        let ctrl = DummyFlashCtrl::new(layout, FlashTiming::default(), None)
            .expect("layout should be valid");
        EmulatedFlashDriver::new(ctrl, PollTimeout::default())
    }

    /// Emulated ticker and CPU clock driving a validator run.
    pub(crate) struct Clocks {
        pub ticker: Rc<EmulatedTicker>,
        pub clock: Rc<CpuClock>,
        pub spin: SpinLoop,
    }

    impl Clocks {
        pub fn new(ticker: EmulatedTicker, cpu_hz: u32) -> Self {
            let ticker = Rc::new(ticker);
            let clock = Rc::new(CpuClock::new(cpu_hz));
            let spin = SpinLoop::new(ticker.clone(), clock.clone());
            Self {
                ticker,
                clock,
                spin,
            }
        }

        pub fn run(
            &self,
            flash: &EmulatedFlashDriver,
            config: ValidatorConfig,
        ) -> ValidationReport {
            FlashValidator::new(flash, self.ticker.as_ref(), &self.spin, config).run()
        }
    }

    /// Random layout whose sectors shrink towards the end of the window, so
    /// every sector stays aligned to its own size.
    pub(crate) fn random_layout(rng: &mut StdRng) -> FlashLayout {
        let page_shift = rng.gen_range(6..=10);
        let mut shifts: Vec<u32> = (0..rng.gen_range(1..=3))
            .map(|_| page_shift + rng.gen_range(1..=6))
            .collect();
        shifts.sort_unstable_by(|a, b| b.cmp(a));
        shifts.dedup();

        let max_sector = 1u32 << shifts[0];
        FlashLayout {
            start: rng.gen_range(0..0x100u32) * max_sector,
            page_size: 1 << page_shift,
            erase_value: if rng.gen_bool(0.5) { 0xFF } else { 0x00 },
            sectors: shifts
                .iter()
                .map(|shift| SectorRun {
                    size: 1 << shift,
                    count: rng.gen_range(1..=8),
                })
                .collect(),
        }
    }
}
