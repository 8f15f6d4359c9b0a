//! Audio backend on top of cpal
//!
//! The cpal stream is not `Send`, so every capture lives on a dedicated
//! thread that owns the stream. The audio callback feeds a ring buffer that
//! the capture thread drains continuously into a window of the newest audio;
//! metering reads that window on request. Nothing is persisted.

use super::backend::{AudioBackend, AudioError, CaptureSession};
use super::meter::LevelWindow;
use super::settings::{CaptureSettings, SessionOptions};
use crate::sensor::SILENCE_FLOOR_DB;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Span of audio the meters average over
const METER_WINDOW: Duration = Duration::from_millis(100);

/// How often the capture thread empties the callback buffer
const DRAIN_INTERVAL: Duration = Duration::from_millis(10);

/// Process-wide audio session state
#[derive(Debug)]
struct SharedSession {
    options: Option<SessionOptions>,
    active: bool,
}

static SHARED_SESSION: Mutex<SharedSession> = Mutex::new(SharedSession {
    options: None,
    active: false,
});

/// Whether some caller has activated the process-wide session
///
/// Never reset by the sensor once set.
pub fn shared_session_active() -> bool {
    SHARED_SESSION.lock().map(|s| s.active).unwrap_or(false)
}

/// Options last applied to the process-wide session
pub fn shared_session_options() -> Option<SessionOptions> {
    SHARED_SESSION.lock().ok().and_then(|s| s.options.clone())
}

/// Backend for the default cpal host and input device
#[derive(Debug, Clone)]
pub struct CpalBackend {
    /// Ring buffer capacity in samples
    buffer_size: usize,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::with_buffer_size(44100) // 1 second at 44.1kHz mono
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    fn default_device() -> Result<cpal::Device, AudioError> {
        cpal::default_host()
            .default_input_device()
            .ok_or(AudioError::NoDevice)
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn configure_session(&self, options: &SessionOptions) -> Result<(), AudioError> {
        Self::default_device()?;

        let mut session = SHARED_SESSION
            .lock()
            .map_err(|_| AudioError::SessionError("session state poisoned".to_string()))?;
        session.options = Some(options.clone());

        tracing::debug!("Audio session configured: {:?}", options);
        Ok(())
    }

    fn activate_session(&self) -> Result<(), AudioError> {
        let device = Self::default_device()?;

        let mut session = SHARED_SESSION
            .lock()
            .map_err(|_| AudioError::SessionError("session state poisoned".to_string()))?;
        session.active = true;

        tracing::debug!("Audio session active on {:?}", device.name());
        Ok(())
    }

    fn open_capture(
        &self,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn CaptureSession>, AudioError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let rb = HeapRb::<f32>::new(self.buffer_size);
        let (producer, consumer) = rb.split();

        let thread_settings = settings.clone();
        let buffer_size = self.buffer_size;
        let thread_handle = thread::Builder::new()
            .name("noise-capture".to_string())
            .spawn(move || {
                run_capture(
                    thread_settings,
                    producer,
                    consumer,
                    buffer_size,
                    command_rx,
                    ready_tx,
                )
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        let channels = match ready_rx.recv() {
            Ok(Ok(channels)) => channels,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(AudioError::CaptureThreadGone);
            }
        };

        Ok(Box::new(CpalCapture::new(
            command_tx,
            thread_handle,
            channels,
            settings.metering_enabled,
        )))
    }

    fn list_devices(&self) -> Vec<String> {
        match cpal::default_host().input_devices() {
            Ok(devices) => devices.filter_map(|device| device.name().ok()).collect(),
            Err(e) => {
                tracing::warn!("Cannot enumerate input devices: {}", e);
                Vec::new()
            }
        }
    }
}

/// Commands to control the capture thread
enum CaptureCommand {
    Record(mpsc::Sender<Result<(), AudioError>>),
    /// Reply with the current per-channel levels
    Meter(mpsc::Sender<Vec<f32>>),
    Stop,
}

/// Capture session backed by a cpal input stream
struct CpalCapture {
    command_tx: mpsc::Sender<CaptureCommand>,
    thread_handle: Option<JoinHandle<()>>,
    metering_enabled: bool,
    levels: Vec<f32>,
}

impl CpalCapture {
    fn new(
        command_tx: mpsc::Sender<CaptureCommand>,
        thread_handle: JoinHandle<()>,
        channels: u16,
        metering_enabled: bool,
    ) -> Self {
        Self {
            command_tx,
            thread_handle: Some(thread_handle),
            metering_enabled,
            levels: vec![SILENCE_FLOOR_DB; channels.max(1) as usize],
        }
    }
}

impl CaptureSession for CpalCapture {
    fn record(&mut self) -> Result<(), AudioError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.command_tx
            .send(CaptureCommand::Record(reply_tx))
            .map_err(|_| AudioError::CaptureThreadGone)?;
        reply_rx.recv().map_err(|_| AudioError::CaptureThreadGone)?
    }

    fn update_meters(&mut self) {
        if !self.metering_enabled {
            return;
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        if self.command_tx.send(CaptureCommand::Meter(reply_tx)).is_err() {
            return;
        }
        if let Ok(levels) = reply_rx.recv() {
            tracing::trace!("Metered {:?} dBFS", levels);
            self.levels = levels;
        }
    }

    fn average_power(&self, channel: usize) -> f32 {
        self.levels.get(channel).copied().unwrap_or(SILENCE_FLOOR_DB)
    }

    fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = self.command_tx.send(CaptureCommand::Stop);
            let _ = handle.join();
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pick the requested format when the device supports it, otherwise the
/// device default
fn select_config(
    device: &cpal::Device,
    settings: &CaptureSettings,
) -> Result<StreamConfig, AudioError> {
    let rate = SampleRate(settings.sample_rate);
    let supported = device
        .supported_input_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .any(|c| {
            c.channels() == settings.channels
                && c.sample_format() == SampleFormat::F32
                && c.min_sample_rate() <= rate
                && rate <= c.max_sample_rate()
        });

    if supported {
        return Ok(StreamConfig {
            channels: settings.channels,
            sample_rate: rate,
            buffer_size: BufferSize::Default,
        });
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?;

    tracing::debug!(
        "{}Hz {}ch unsupported, using device default {}Hz {}ch",
        settings.sample_rate,
        settings.channels,
        fallback.sample_rate().0,
        fallback.channels()
    );

    Ok(fallback.into())
}

/// Move whole frames from the callback buffer into the window
///
/// A partial trailing frame stays buffered so channels never shift.
fn drain_frames(
    consumer: &mut HeapCons<f32>,
    scratch: &mut [f32],
    channels: u16,
    window: &mut LevelWindow,
) -> usize {
    let frame = channels.max(1) as usize;
    let mut drained = 0;

    loop {
        let available = consumer.occupied_len().min(scratch.len()) / frame * frame;
        if available == 0 {
            break;
        }
        let count = consumer.pop_slice(&mut scratch[..available]);
        window.push(&scratch[..count]);
        drained += count;
    }

    drained
}

/// Answer capture commands until stopped, draining audio between them
fn serve_commands<P>(
    command_rx: mpsc::Receiver<CaptureCommand>,
    mut consumer: HeapCons<f32>,
    mut window: LevelWindow,
    buffer_size: usize,
    mut play: P,
) where
    P: FnMut() -> Result<(), AudioError>,
{
    let channels = window.channels();
    let mut scratch = vec![0.0; buffer_size.max(channels as usize)];

    loop {
        match command_rx.recv_timeout(DRAIN_INTERVAL) {
            Ok(CaptureCommand::Record(reply)) => {
                let _ = reply.send(play());
            }
            Ok(CaptureCommand::Meter(reply)) => {
                drain_frames(&mut consumer, &mut scratch, channels, &mut window);
                let _ = reply.send(window.levels());
            }
            Ok(CaptureCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                drain_frames(&mut consumer, &mut scratch, channels, &mut window);
            }
        }
    }
}

/// Run one capture (in its own thread)
fn run_capture(
    settings: CaptureSettings,
    mut producer: HeapProd<f32>,
    consumer: HeapCons<f32>,
    buffer_size: usize,
    command_rx: mpsc::Receiver<CaptureCommand>,
    ready_tx: mpsc::Sender<Result<u16, AudioError>>,
) {
    let device = match CpalBackend::default_device() {
        Ok(device) => device,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let config = match select_config(&device, &settings) {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            producer.push_slice(data);
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
            return;
        }
    };

    tracing::info!(
        "Capture opened on {:?}: {}Hz {}ch {:?}/{:?}",
        device.name(),
        config.sample_rate.0,
        config.channels,
        settings.encoding,
        settings.quality
    );

    if ready_tx.send(Ok(config.channels)).is_err() {
        return;
    }

    let frames = (u64::from(config.sample_rate.0) * METER_WINDOW.as_millis() as u64 / 1000) as usize;
    let window = LevelWindow::new(frames, config.channels);

    serve_commands(command_rx, consumer, window, buffer_size, || {
        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))
    });

    drop(stream);
    tracing::info!("Capture closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIET: f32 = 0.001; // -60 dBFS
    const LOUD: f32 = 0.5; // about -6 dBFS

    /// Window of 100ms at 44.1kHz
    fn window(channels: u16) -> LevelWindow {
        LevelWindow::new(4410, channels)
    }

    fn push_callbacks(producer: &mut HeapProd<f32>, count: usize, amplitude: f32) {
        let block = [amplitude; 480];
        for _ in 0..count {
            assert_eq!(producer.push_slice(&block), block.len());
        }
    }

    /// Capture whose thread serves commands over a fake stream
    fn fake_capture(channels: u16, buffer_size: usize) -> (CpalCapture, HeapProd<f32>) {
        let (producer, consumer) = HeapRb::<f32>::new(buffer_size).split();
        let (command_tx, command_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            serve_commands(command_rx, consumer, window(channels), buffer_size, || Ok(()));
        });
        (CpalCapture::new(command_tx, handle, channels, true), producer)
    }

    #[test]
    fn drain_keeps_only_newest_audio() {
        let (mut producer, mut consumer) = HeapRb::<f32>::new(44100).split();
        let mut scratch = vec![0.0; 44100];
        let mut window = window(2);

        push_callbacks(&mut producer, 20, QUIET);
        push_callbacks(&mut producer, 20, LOUD);
        let drained = drain_frames(&mut consumer, &mut scratch, 2, &mut window);

        assert_eq!(drained, 40 * 480);
        assert!((window.levels()[0] + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn continuous_draining_follows_current_signal() {
        let (mut producer, mut consumer) = HeapRb::<f32>::new(44100).split();
        let mut scratch = vec![0.0; 44100];
        let mut window = window(2);

        for amplitude in [QUIET, LOUD] {
            for _ in 0..20 {
                push_callbacks(&mut producer, 5, amplitude);
                drain_frames(&mut consumer, &mut scratch, 2, &mut window);
            }
        }

        assert!((window.levels()[0] + 6.0206).abs() < 1e-3);
        assert!((window.levels()[1] + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn drain_leaves_partial_frame_buffered() {
        let (mut producer, mut consumer) = HeapRb::<f32>::new(16).split();
        let mut scratch = vec![0.0; 16];
        let mut window = window(2);

        producer.push_slice(&[0.5, 0.1, 0.5]);
        assert_eq!(drain_frames(&mut consumer, &mut scratch, 2, &mut window), 2);
        assert_eq!(consumer.occupied_len(), 1);

        producer.push_slice(&[0.1]);
        assert_eq!(drain_frames(&mut consumer, &mut scratch, 2, &mut window), 2);
        assert!((window.levels()[0] + 6.0206).abs() < 1e-3);
        assert!((window.levels()[1] + 20.0).abs() < 1e-3);
    }

    #[test]
    fn capture_meters_audio_arriving_after_record() {
        let (mut capture, mut producer) = fake_capture(2, 44100);

        capture.record().unwrap();
        capture.update_meters();
        assert_eq!(capture.average_power(0), SILENCE_FLOOR_DB);

        push_callbacks(&mut producer, 50, QUIET);
        thread::sleep(DRAIN_INTERVAL * 3);
        push_callbacks(&mut producer, 50, LOUD);
        capture.update_meters();

        assert!((capture.average_power(0) + 6.0206).abs() < 1e-3);
        assert_eq!(capture.average_power(2), SILENCE_FLOOR_DB);
        capture.stop();
    }

    #[test]
    fn long_settle_does_not_overflow_into_stale_audio() {
        // Far less than the audio pushed: only continuous draining keeps up
        let (mut capture, mut producer) = fake_capture(2, 9600);

        capture.record().unwrap();
        for amplitude in [QUIET, LOUD] {
            for _ in 0..40 {
                producer.push_slice(&[amplitude; 480]);
                thread::sleep(Duration::from_millis(2));
            }
        }
        thread::sleep(DRAIN_INTERVAL * 3);
        capture.update_meters();

        assert!((capture.average_power(0) + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn stopped_capture_keeps_last_levels() {
        let (mut capture, mut producer) = fake_capture(1, 44100);

        push_callbacks(&mut producer, 10, LOUD);
        capture.update_meters();
        capture.stop();
        capture.update_meters();

        assert!((capture.average_power(0) + 6.0206).abs() < 1e-3);
    }
}
