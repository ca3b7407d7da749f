// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::init_logging;
    use emulator::{load_scenarios, run_scenario, RunEnv};
    use emulator_periph::{
        DummyFlashCtrl, EmulatedFlashDriver, FlashLayout, FlashTiming, PollTimeout,
    };
    use flash_hal::FlashSession;
    use flash_validator::{SkipReason, Step, StepOutcome, ValidationError};
    use std::path::Path;

    fn open_file_backed(path: &Path) -> EmulatedFlashDriver {
        let ctrl = DummyFlashCtrl::new(
            FlashLayout::stm32f4(),
            FlashTiming::default(),
            Some(path.to_path_buf()),
        )
        .unwrap();
        EmulatedFlashDriver::new(ctrl, PollTimeout::default())
    }

    #[test]
    fn test_contents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.bin");

        {
            let flash = open_file_backed(&path);
            let session = FlashSession::open(&flash).unwrap();
            session.erase_sector(0x0802_0000).unwrap();
            session.program_page(0x0802_0000, &[0x5A; 512]).unwrap();
            session.free().unwrap();
        }
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0x10_0000);

        let flash = open_file_backed(&path);
        let session = FlashSession::open(&flash).unwrap();
        let mut buf = [0u8; 768];
        session.read(0x0802_0000, &mut buf).unwrap();
        assert_eq!(&buf[..512], &[0x5A; 512][..]);
        assert_eq!(&buf[512..], &[0xFF; 256][..]);

        session.erase_sector(0x0802_0000).unwrap();
        session.read(0x0802_0000, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 768]);
    }

    #[test]
    fn test_scenario_file_runs() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let scenario_path = dir.path().join("scenarios.toml");
        std::fs::write(
            &scenario_path,
            r#"
            [[scenario]]
            name = "reserved-image"
            layout = { start = 0x08000000, page_size = 256, sectors = [{ size = 0x20000, count = 2 }] }
            validator = { reserved_end = 0x08040000 }

            [[scenario]]
            name = "lossy"
            layout = { start = 0x20000000, page_size = 128, sectors = [{ size = 0x800, count = 32 }] }
            faults = { drop_writes = true }

            [[scenario]]
            name = "stuck"
            layout = { start = 0x20000000, page_size = 128, sectors = [{ size = 0x800, count = 32 }] }
            faults = { stall = true }
            "#,
        )
        .unwrap();

        let scenarios = load_scenarios(&scenario_path).unwrap();
        let env = RunEnv {
            flash_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let reserved = run_scenario(&scenarios[0], &env).unwrap();
        assert!(reserved.passed());
        assert_eq!(
            reserved.outcome(Step::Erase),
            Some(&StepOutcome::Skipped(SkipReason::Reserved {
                boundary: 0x0802_0000,
                reserved_end: 0x0804_0000,
            }))
        );
        assert_eq!(
            reserved.outcome(Step::Verify),
            Some(&StepOutcome::Skipped(SkipReason::NothingProgrammed))
        );

        let lossy = run_scenario(&scenarios[1], &env).unwrap();
        assert!(matches!(
            lossy.failure(),
            Some(ValidationError::VerificationMismatch { expected: 0xCE, actual: 0xFF, .. })
        ));

        let stuck = run_scenario(&scenarios[2], &env).unwrap();
        assert_eq!(
            stuck.failure(),
            Some(&ValidationError::Flash(flash_hal::FlashError::HardwareTimeout))
        );

        for name in ["reserved-image", "lossy", "stuck"] {
            assert!(dir.path().join(format!("{}.bin", name)).exists());
        }
    }

    #[test]
    fn test_missing_scenario_file() {
        let err = load_scenarios(Path::new("/nonexistent/scenarios.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("reading scenario file"));
    }
}
