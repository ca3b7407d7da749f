// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{driver, init_logging, random_layout, Clocks};
    use emulator_periph::{EmulatedFlashDriver, EmulatedTicker, FlashLayout};
    use flash_hal::{
        check_geometry, FlashDevice, FlashError, FlashSession, GeometryError, SectorWalk,
        INVALID_SIZE,
    };
    use flash_validator::{
        FlashValidator, Step, StepOutcome, ValidationError, ValidatorConfig, ValidatorState,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Wraps a working driver and lies about one sector.
    struct MisreportingFlash {
        inner: EmulatedFlashDriver,
        address: u32,
        size: u32,
    }

    impl FlashDevice for MisreportingFlash {
        fn init(&self) -> Result<(), FlashError> {
            self.inner.init()
        }
        fn free(&self) -> Result<(), FlashError> {
            self.inner.free()
        }
        fn page_size(&self) -> u32 {
            self.inner.page_size()
        }
        fn start_address(&self) -> u32 {
            self.inner.start_address()
        }
        fn size(&self) -> u32 {
            self.inner.size()
        }
        fn sector_size(&self, address: u32) -> u32 {
            if address == self.address {
                self.size
            } else {
                self.inner.sector_size(address)
            }
        }
        fn erase_sector(&self, address: u32) -> Result<(), FlashError> {
            self.inner.erase_sector(address)
        }
        fn program_page(&self, address: u32, data: &[u8]) -> Result<(), FlashError> {
            self.inner.program_page(address, data)
        }
        fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
            self.inner.read(address, buf)
        }
    }

    #[test]
    fn test_uniform_part_end_to_end() {
        init_logging();
        let flash = driver(FlashLayout::uniform());
        let ticker = EmulatedTicker::new(1_000_000, 32).with_read_step(0);
        let clocks = Clocks::new(ticker, 400_000_000);
        let report = clocks.run(&flash, ValidatorConfig::default());

        assert!(report.passed(), "{}", report);
        for step in [
            Step::Init,
            Step::GeometryCheck,
            Step::Erase,
            Step::Program,
            Step::Verify,
            Step::DriftCheck,
        ] {
            assert_eq!(report.outcome(step), Some(&StepOutcome::Passed));
        }
        let geometry = report.geometry.unwrap();
        assert_eq!(geometry.sectors, 256);
        assert!(geometry.is_uniform());
        assert_eq!(report.baseline_us, Some(25_000));
        assert_eq!(report.final_us, Some(25_000));

        // The session was freed, so the part can be opened again.
        let session = FlashSession::open(&flash).unwrap();
        let mut buf = [0u8; 256];
        session.read(0x080F_FE00, &mut buf).unwrap();
        assert_eq!(buf, [0xAC; 256]);
        session.read(0x080F_FF00, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 256]);
    }

    #[test]
    fn test_random_layouts() {
        init_logging();
        let mut rng = StdRng::seed_from_u64(0x5EC7_0125);
        for _ in 0..64 {
            let layout = random_layout(&mut rng);
            let expected_sectors: u32 = layout.sectors.iter().map(|run| run.count).sum();
            let flash = driver(layout.clone());

            let report = check_geometry(&flash)
                .unwrap_or_else(|err| panic!("{:?} rejected: {}", layout, err));
            assert_eq!(report.sectors, expected_sectors);
            assert_eq!(report.size as u64, layout.capacity());
            assert_eq!(flash.sector_size(layout.start + report.size), INVALID_SIZE);

            let walked: u64 = SectorWalk::new(&flash)
                .map(|sector| sector.unwrap().size as u64)
                .sum();
            assert_eq!(walked, layout.capacity());

            let clocks = Clocks::new(EmulatedTicker::new(1_000_000, 32), 400_000_000);
            let config = ValidatorConfig {
                cycles: 100_000,
                ..Default::default()
            };
            let validation = clocks.run(&flash, config);
            assert!(validation.passed(), "{:?}\n{}", layout, validation);
        }
    }

    #[test]
    fn test_misreported_sector_fails_geometry() {
        init_logging();
        let flash = MisreportingFlash {
            inner: driver(FlashLayout::stm32f4()),
            address: 0x0801_0000,
            size: 0x4000,
        };
        assert!(matches!(
            check_geometry(&flash),
            Err(GeometryError::InconsistentBoundary { .. })
        ));

        let clocks = Clocks::new(EmulatedTicker::new(1_000_000, 32), 400_000_000);
        let report = FlashValidator::new(
            &flash,
            clocks.ticker.as_ref(),
            &clocks.spin,
            ValidatorConfig::default(),
        )
        .run();
        assert!(matches!(
            report.state,
            ValidatorState::Failed(ValidationError::Geometry(_))
        ));
        assert!(report.outcome(Step::Erase).is_none());
        // The failed run released the device.
        FlashSession::open(&flash).unwrap().free().unwrap();
    }

    #[test]
    fn test_second_session_is_refused() {
        let flash = driver(FlashLayout::uniform());
        let session = FlashSession::open(&flash).unwrap();
        assert_eq!(
            FlashSession::open(&flash).err(),
            Some(FlashError::AlreadyOpen)
        );

        let clocks = Clocks::new(EmulatedTicker::new(1_000_000, 32), 400_000_000);
        let report = clocks.run(&flash, ValidatorConfig::default());
        assert_eq!(
            report.failure(),
            Some(&ValidationError::Flash(FlashError::AlreadyOpen))
        );
        session.free().unwrap();
    }
}
