//! Drives the receive task with a scripted capture source, an in-memory console, and a
//! delay that records what it was asked for.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType, Write};
use pdm_mic_rx::{
    BUFF_SIZE, CaptureError, ConfigError, Error, PdmCapture, PdmRxConfig, PdmRxTask, Result,
};

/// Hands out one scripted read result per call, and records the timeouts it was given.
#[derive(Default)]
struct ScriptedMic {
    reads: VecDeque<Result<Vec<u8>>>,
    timeouts: Vec<u32>,
}

impl ScriptedMic {
    fn push_samples(&mut self, samples: &[i16]) {
        let bytes = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.reads.push_back(Ok(bytes));
    }

    fn push_error(&mut self, e: CaptureError) {
        self.reads.push_back(Err(e.into()));
    }
}

impl PdmCapture for ScriptedMic {
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        self.timeouts.push(timeout_ms);

        let bytes = self
            .reads
            .pop_front()
            .unwrap_or(Err(CaptureError::Timeout.into()))?;
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }
}

#[derive(Default)]
struct Console {
    out: Vec<u8>,
}

impl Console {
    fn lines(&self) -> Vec<i16> {
        std::str::from_utf8(&self.out)
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect()
    }
}

impl ErrorType for Console {
    type Error = ErrorKind;
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
        self.out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDelay {
    ns: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns.push(ns);
    }
}

fn task(mic: ScriptedMic) -> PdmRxTask<ScriptedMic, Console, RecordingDelay> {
    PdmRxTask::new(
        mic,
        Console::default(),
        RecordingDelay::default(),
        PdmRxConfig::default(),
    )
    .unwrap()
}

#[test]
fn block_is_printed_with_offset_removed() {
    let mut mic = ScriptedMic::default();
    mic.push_samples(&[110, 90, 105, 95]);

    let mut task = task(mic);
    assert_eq!(task.poll_once(), Ok(4));

    let (mic, console, _) = task.release();
    assert_eq!(console.out, b"10\n-10\n5\n-5\n");
    assert_eq!(mic.timeouts, [1_000]);
}

#[test]
fn failed_reads_print_nothing() {
    let mut mic = ScriptedMic::default();
    mic.push_error(CaptureError::Timeout);
    mic.push_error(CaptureError::Overrun);
    mic.push_samples(&[3, 5]);

    let mut task = task(mic);

    assert_eq!(
        task.poll_once(),
        Err(Error::CaptureError(CaptureError::Timeout))
    );
    assert_eq!(
        task.poll_once(),
        Err(Error::CaptureError(CaptureError::Overrun))
    );
    assert_eq!(task.poll_once(), Ok(2));

    let (_, console, _) = task.release();
    assert_eq!(console.lines(), [-1, 1]);
}

#[test]
fn empty_read_is_skipped() {
    let mut mic = ScriptedMic::default();
    mic.reads.push_back(Ok(Vec::new()));
    // A lone byte isn't a sample either.
    mic.reads.push_back(Ok(vec![0x42]));

    let mut task = task(mic);
    assert_eq!(task.poll_once(), Err(Error::EmptyInput));
    assert_eq!(task.poll_once(), Err(Error::EmptyInput));

    let (_, console, _) = task.release();
    assert!(console.out.is_empty());
}

#[test]
fn blocks_are_independent() {
    let mut mic = ScriptedMic::default();
    mic.push_samples(&[1_000, 1_000]);
    mic.push_samples(&[-20, 0, 20, 40]);

    let mut task = task(mic);
    task.poll_once().unwrap();
    task.poll_once().unwrap();

    let (_, console, _) = task.release();
    // The second block's mean is 10; nothing carries over from the first.
    assert_eq!(console.lines(), [0, 0, -30, -10, 10, 30]);
}

#[test]
fn read_is_capped_at_block_size() {
    let mut mic = ScriptedMic::default();
    let samples: Vec<i16> = (0..BUFF_SIZE as i16).collect();
    mic.push_samples(&samples);

    let mut task = task(mic);
    assert_eq!(task.poll_once(), Ok(BUFF_SIZE / 2));
}

#[test]
fn small_block_size() {
    let mut mic = ScriptedMic::default();
    mic.push_samples(&[8, 4, 100, 100]);

    let mut task: PdmRxTask<_, _, _, 4> = PdmRxTask::new(
        mic,
        Console::default(),
        RecordingDelay::default(),
        PdmRxConfig::default(),
    )
    .unwrap();

    // Only the first two samples fit.
    assert_eq!(task.poll_once(), Ok(2));
    let (_, console, _) = task.release();
    assert_eq!(console.lines(), [2, -2]);
}

#[test]
fn rejects_bad_config() {
    let cfg = PdmRxConfig {
        read_timeout_ms: 0,
        ..Default::default()
    };
    let result: Result<PdmRxTask<_, _, _>> = PdmRxTask::new(
        ScriptedMic::default(),
        Console::default(),
        RecordingDelay::default(),
        cfg,
    );
    assert!(matches!(
        result,
        Err(Error::ConfigError(ConfigError::ZeroTimeout))
    ));

    let result: Result<PdmRxTask<_, _, _, 1>> = PdmRxTask::new(
        ScriptedMic::default(),
        Console::default(),
        RecordingDelay::default(),
        PdmRxConfig::default(),
    );
    assert!(matches!(
        result,
        Err(Error::ConfigError(ConfigError::BufferTooSmall))
    ));
}

#[test]
fn custom_timeout_is_passed_to_capture() {
    let mut mic = ScriptedMic::default();
    mic.push_samples(&[1]);

    let cfg = PdmRxConfig {
        read_timeout_ms: 250,
        ..Default::default()
    };
    let mut task: PdmRxTask<_, _, _> =
        PdmRxTask::new(mic, Console::default(), RecordingDelay::default(), cfg).unwrap();
    task.poll_once().unwrap();

    let (mic, _, delay) = task.release();
    assert_eq!(mic.timeouts, [250]);
    // `poll_once` never waits; only `run` does.
    assert!(delay.ns.is_empty());
}

#[test]
fn waits_after_every_cycle() {
    let mut mic = ScriptedMic::default();
    mic.push_samples(&[1, 3]);
    mic.push_error(CaptureError::ClockAbsent);

    let mut task = task(mic);
    assert_eq!(task.poll_and_wait(), Ok(2));
    assert_eq!(
        task.poll_and_wait(),
        Err(Error::CaptureError(CaptureError::ClockAbsent))
    );

    let (_, console, delay) = task.release();
    assert_eq!(console.lines(), [-1, 1]);

    // 50ms each, failed cycle included. `delay_ms` may split the wait into several calls.
    let total: u64 = delay.ns.iter().map(|&ns| ns as u64).sum();
    assert_eq!(total, 2 * 50_000_000);
}

#[test]
fn timeout_must_cover_a_block() {
    // 1024 samples at 16kHz take 64ms.
    let cfg = PdmRxConfig {
        read_timeout_ms: 10,
        ..Default::default()
    };
    let result: Result<PdmRxTask<_, _, _>> = PdmRxTask::new(
        ScriptedMic::default(),
        Console::default(),
        RecordingDelay::default(),
        cfg,
    );
    assert!(matches!(
        result,
        Err(Error::ConfigError(ConfigError::TimeoutTooShort))
    ));

    // The same timeout is fine for a smaller block.
    let result: Result<PdmRxTask<_, _, _, 64>> = PdmRxTask::new(
        ScriptedMic::default(),
        Console::default(),
        RecordingDelay::default(),
        cfg,
    );
    assert!(result.is_ok());
}
