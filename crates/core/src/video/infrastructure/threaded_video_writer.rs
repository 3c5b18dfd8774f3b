use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::shared::constants::DEFAULT_QUEUE_CAPACITY;
use crate::shared::frame_duration::PresentationTime;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::stream_config::StreamConfig;
use crate::video::domain::video_writer::VideoWriter;

type SendError = Box<dyn std::error::Error + Send + Sync>;

enum Job {
    Frame {
        buffer: PixelBuffer,
        pts: PresentationTime,
    },
    /// Acknowledged once every frame queued before it has been appended.
    Flush(Sender<()>),
}

/// Runs another writer on a dedicated encode thread behind a bounded queue.
///
/// Layout: `frame loop → [queue] → encode thread → inner writer`
///
/// `append` copies the frame into a recycled buffer, so the caller's buffer
/// is free again as soon as it returns. The writer reports itself not ready
/// while the queue is full. An inner-writer error ends the encode thread
/// and is returned from the next readiness check, `append`, `flush` or
/// `finish`.
pub struct ThreadedVideoWriter {
    inner: Option<Box<dyn VideoWriter>>,
    capacity: usize,
    frame_tx: Option<Sender<Job>>,
    recycle_rx: Option<Receiver<PixelBuffer>>,
    worker: Option<JoinHandle<Result<Box<dyn VideoWriter>, SendError>>>,
}

impl ThreadedVideoWriter {
    pub fn new(inner: Box<dyn VideoWriter>) -> Self {
        Self::with_capacity(inner, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(inner: Box<dyn VideoWriter>, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            frame_tx: None,
            recycle_rx: None,
            worker: None,
        }
    }

    /// Frames queued but not yet handed to the inner writer.
    pub fn queued(&self) -> usize {
        self.frame_tx.as_ref().map(|tx| tx.len()).unwrap_or(0)
    }

    fn worker_stopped(&self) -> bool {
        self.worker.as_ref().map(|w| w.is_finished()).unwrap_or(true)
    }

    /// Joins an encode thread that hung up early and returns why.
    fn stopped_error(&mut self) -> Box<dyn std::error::Error> {
        match self.join_worker() {
            Err(e) => e,
            Ok(_) => "Encode thread stopped unexpectedly".into(),
        }
    }

    /// Closes the queue and waits for the encode thread, returning the
    /// inner writer or the error that stopped it.
    fn join_worker(&mut self) -> Result<Box<dyn VideoWriter>, Box<dyn std::error::Error>> {
        self.frame_tx = None;
        self.recycle_rx = None;
        let worker = self.worker.take().ok_or("ThreadedVideoWriter: not opened")?;
        match worker.join() {
            Ok(Ok(writer)) => Ok(writer),
            Ok(Err(e)) => Err(e.to_string().into()),
            Err(_) => Err("Encode thread panicked".into()),
        }
    }
}

impl VideoWriter for ThreadedVideoWriter {
    fn open(&mut self, config: &StreamConfig) -> Result<(), Box<dyn std::error::Error>> {
        let mut inner = self
            .inner
            .take()
            .ok_or("ThreadedVideoWriter: already opened")?;
        inner.open(config)?;

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Job>(self.capacity);
        let (recycle_tx, recycle_rx) = crossbeam_channel::unbounded::<PixelBuffer>();

        self.worker = Some(spawn_encoder(inner, frame_rx, recycle_tx));
        self.frame_tx = Some(frame_tx);
        self.recycle_rx = Some(recycle_rx);
        Ok(())
    }

    fn is_ready_for_more_data(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        let full = self
            .frame_tx
            .as_ref()
            .ok_or("ThreadedVideoWriter: not opened")?
            .is_full();
        if self.worker_stopped() {
            return Err(self.stopped_error());
        }
        Ok(!full)
    }

    fn append(
        &mut self,
        buffer: &PixelBuffer,
        pts: PresentationTime,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(tx), Some(recycle_rx)) = (self.frame_tx.as_ref(), self.recycle_rx.as_ref())
        else {
            return Err("ThreadedVideoWriter: not opened".into());
        };

        let mut copy = match recycle_rx.try_recv() {
            Ok(recycled) if recycled.size() == buffer.size() => recycled,
            _ => PixelBuffer::new(buffer.size()),
        };
        if copy.data().len() != buffer.data().len() {
            return Err(format!(
                "frame holds {} bytes, {} needs {}",
                buffer.data().len(),
                buffer.size(),
                copy.data().len()
            )
            .into());
        }
        copy.data_mut().copy_from_slice(buffer.data());

        if tx.send(Job::Frame { buffer: copy, pts }).is_err() {
            // The encode thread hung up, which only happens on error.
            return Err(self.stopped_error());
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let tx = self
            .frame_tx
            .as_ref()
            .ok_or("ThreadedVideoWriter: not opened")?;
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if tx.send(Job::Flush(ack_tx)).is_err() || ack_rx.recv().is_err() {
            return Err(self.stopped_error());
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut inner = self.join_worker()?;
        inner.finish()
    }
}

impl Drop for ThreadedVideoWriter {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.join_worker();
        }
    }
}

fn spawn_encoder(
    mut writer: Box<dyn VideoWriter>,
    frame_rx: Receiver<Job>,
    recycle_tx: Sender<PixelBuffer>,
) -> JoinHandle<Result<Box<dyn VideoWriter>, SendError>> {
    std::thread::spawn(move || {
        for job in frame_rx {
            match job {
                Job::Frame { buffer, pts } => {
                    writer.append(&buffer, pts).map_err(|e| -> SendError {
                        format!("frame at pts {}: {e}", pts.value).into()
                    })?;
                    let _ = recycle_tx.send(buffer);
                }
                Job::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        Ok(writer)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame_duration::FrameDuration;
    use crate::shared::frame_size::FrameSize;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorded {
        opened: bool,
        frames: Vec<(u8, i64)>,
        finished: bool,
    }

    struct StubWriter {
        state: Arc<Mutex<Recorded>>,
        fail_at: Option<usize>,
        delay: Duration,
    }

    impl StubWriter {
        fn new(state: Arc<Mutex<Recorded>>) -> Self {
            Self {
                state,
                fail_at: None,
                delay: Duration::ZERO,
            }
        }
    }

    impl VideoWriter for StubWriter {
        fn open(&mut self, _config: &StreamConfig) -> Result<(), Box<dyn std::error::Error>> {
            self.state.lock().unwrap().opened = true;
            Ok(())
        }

        fn append(
            &mut self,
            buffer: &PixelBuffer,
            pts: PresentationTime,
        ) -> Result<(), Box<dyn std::error::Error>> {
            std::thread::sleep(self.delay);
            let mut state = self.state.lock().unwrap();
            if Some(state.frames.len()) == self.fail_at {
                return Err("disk full".into());
            }
            state.frames.push((buffer.data()[0], pts.value));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.state.lock().unwrap().finished = true;
            Ok(())
        }
    }

    fn config() -> StreamConfig {
        StreamConfig {
            output_path: PathBuf::from("/tmp/unused.mp4"),
            frame_size: FrameSize::new(2, 2),
            frame_duration: FrameDuration::new(1, 25),
        }
    }

    fn buffer(value: u8) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(FrameSize::new(2, 2));
        buffer.fill([value; 4]);
        buffer
    }

    fn pts(value: i64) -> PresentationTime {
        PresentationTime {
            value,
            timescale: 25,
        }
    }

    #[test]
    fn test_frames_reach_inner_writer_in_order() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut writer = ThreadedVideoWriter::with_capacity(Box::new(StubWriter::new(state.clone())), 2);

        writer.open(&config()).unwrap();
        let mut reused = buffer(0);
        for i in 0..10u8 {
            reused.fill([i; 4]);
            while !writer.is_ready_for_more_data().unwrap() {
                std::thread::sleep(Duration::from_millis(1));
            }
            writer.append(&reused, pts(i as i64)).unwrap();
        }
        writer.finish().unwrap();

        let state = state.lock().unwrap();
        assert!(state.opened);
        assert!(state.finished);
        let expected: Vec<(u8, i64)> = (0..10).map(|i| (i as u8, i as i64)).collect();
        assert_eq!(state.frames, expected);
    }

    #[test]
    fn test_not_ready_while_queue_is_full() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut stub = StubWriter::new(state.clone());
        stub.delay = Duration::from_millis(200);
        let mut writer = ThreadedVideoWriter::with_capacity(Box::new(stub), 1);
        writer.open(&config()).unwrap();

        // One frame is picked up by the encode thread, one sits in the queue.
        writer.append(&buffer(1), pts(0)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        writer.append(&buffer(2), pts(1)).unwrap();

        assert_eq!(writer.queued(), 1);
        assert!(!writer.is_ready_for_more_data().unwrap());

        writer.finish().unwrap();
        assert_eq!(state.lock().unwrap().frames.len(), 2);
    }

    #[test]
    fn test_inner_error_surfaces_on_later_call() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut stub = StubWriter::new(state.clone());
        stub.fail_at = Some(1);
        let mut writer = ThreadedVideoWriter::with_capacity(Box::new(stub), 4);
        writer.open(&config()).unwrap();

        let mut result = Ok(());
        for i in 0..50 {
            result = writer.append(&buffer(i as u8), pts(i));
            if result.is_err() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        let err = match result {
            Err(e) => e,
            Ok(()) => writer.finish().unwrap_err(),
        };
        assert!(err.to_string().contains("disk full"));
        assert!(!state.lock().unwrap().finished);
    }

    #[test]
    fn test_readiness_reports_stopped_worker_error() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut stub = StubWriter::new(state.clone());
        stub.fail_at = Some(0);
        let mut writer = ThreadedVideoWriter::with_capacity(Box::new(stub), 4);
        writer.open(&config()).unwrap();

        writer.append(&buffer(1), pts(7)).unwrap();
        let err = loop {
            match writer.is_ready_for_more_data() {
                Ok(_) => std::thread::sleep(Duration::from_millis(1)),
                Err(e) => break e,
            }
        };

        assert!(err.to_string().contains("frame at pts 7: disk full"));
        assert!(state.lock().unwrap().frames.is_empty());
    }

    #[test]
    fn test_flush_waits_for_queued_frames() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut stub = StubWriter::new(state.clone());
        stub.delay = Duration::from_millis(10);
        let mut writer = ThreadedVideoWriter::with_capacity(Box::new(stub), 4);
        writer.open(&config()).unwrap();

        for i in 0..3u8 {
            writer.append(&buffer(i), pts(i as i64)).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(state.lock().unwrap().frames.len(), 3);
        assert!(!state.lock().unwrap().finished);
        writer.finish().unwrap();
        assert!(state.lock().unwrap().finished);
    }

    #[test]
    fn test_flush_surfaces_append_error() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut stub = StubWriter::new(state.clone());
        stub.fail_at = Some(1);
        let mut writer = ThreadedVideoWriter::with_capacity(Box::new(stub), 4);
        writer.open(&config()).unwrap();

        writer.append(&buffer(0), pts(0)).unwrap();
        writer.append(&buffer(1), pts(1)).unwrap();
        let err = writer.flush().unwrap_err();

        assert!(err.to_string().contains("frame at pts 1: disk full"));
        assert_eq!(state.lock().unwrap().frames.len(), 1);
    }

    #[test]
    fn test_calls_before_open_fail() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut writer = ThreadedVideoWriter::new(Box::new(StubWriter::new(state)));
        assert!(writer.is_ready_for_more_data().is_err());
        assert!(writer.append(&buffer(0), pts(0)).is_err());
        assert!(writer.flush().is_err());
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_open_twice_fails() {
        let state = Arc::new(Mutex::new(Recorded::default()));
        let mut writer = ThreadedVideoWriter::new(Box::new(StubWriter::new(state)));
        writer.open(&config()).unwrap();
        assert!(writer.open(&config()).is_err());
    }
}
