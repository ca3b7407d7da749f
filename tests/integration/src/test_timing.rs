// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{driver, init_logging, Clocks};
    use emulator_periph::{EmulatedTicker, FlashLayout};
    use flash_validator::{ValidationError, ValidatorConfig};
    use mcu_ticker::{overflow_protect, CycleTimer, Protection, Ticker};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_overflow_protect_leaves_window() {
        let mut rng = StdRng::seed_from_u64(0x0F10_0D);
        for _ in 0..256 {
            let bits = rng.gen_range(17..=32u8);
            let max = if bits == 32 { u32::MAX } else { (1 << bits) - 1 };
            let start = rng.gen_range(max - 50_000..=max);
            let ticker = EmulatedTicker::new(1_000_000, bits)
                .with_start(start)
                .with_read_step(rng.gen_range(1..=64));

            let protection = overflow_protect(&ticker, 35_000);
            let now = ticker.now();
            if max - start <= 35_000 {
                assert_eq!(protection, Protection::Wrapped, "bits {} start {:#x}", bits, start);
                assert!(max - now > 35_000);
            } else {
                assert_eq!(protection, Protection::Headroom, "bits {} start {:#x}", bits, start);
            }
        }
    }

    #[test]
    fn test_sample_after_protection_has_no_wrap() {
        let ticker = EmulatedTicker::new(1_000_000, 24).with_start(0xFF_F000);
        let clocks = Clocks::new(ticker, 400_000_000);
        let timer = CycleTimer::new(clocks.ticker.as_ref(), &clocks.spin);

        assert_eq!(overflow_protect(clocks.ticker.as_ref(), 35_000), Protection::Wrapped);
        let sample = timer.sample(10_000_000);
        assert!(sample.end > sample.start);
        // One tick per read on top of the loop itself
        assert_eq!(sample.elapsed_us(), 25_001);
        assert_eq!(clocks.ticker.info().max_count(), 0xFF_FFFF);
    }

    #[test]
    fn test_clock_change_is_detected() {
        init_logging();
        let flash = driver(FlashLayout::stm32f4());
        let ticker = EmulatedTicker::new(1_000_000, 32).with_read_step(0);
        let clocks = Clocks::new(ticker, 400_000_000);
        flash.ctrl().set_erase_clock_hook(clocks.clock.clone(), 397_000_000);

        let report = clocks.run(&flash, ValidatorConfig::default());
        assert_eq!(clocks.clock.hz(), 397_000_000);
        assert_eq!(
            report.failure(),
            Some(&ValidationError::DriftExceeded {
                baseline_us: 25_000,
                measured_us: 25_188,
                allowed_us: 125,
            })
        );
    }

    #[test]
    fn test_clock_change_within_tolerance() {
        let flash = driver(FlashLayout::uniform());
        let ticker = EmulatedTicker::new(1_000_000, 32).with_read_step(0);
        let clocks = Clocks::new(ticker, 400_000_000);
        flash.ctrl().set_erase_clock_hook(clocks.clock.clone(), 399_000_000);

        let report = clocks.run(&flash, ValidatorConfig::default());
        assert!(report.passed(), "{}", report);
        assert_eq!(report.final_us, Some(25_062));
    }
}
