//! Background frame acquisition with a bounded number of frames in flight.
//!
//! The acquisition thread pulls frames from a [`FrameSource`] as fast as the
//! source delivers them, but never hands out more than `max_in_flight`
//! frames that the pipeline has not yet released. Every delivered frame
//! carries a lease that is returned exactly once, either explicitly through
//! [`AcquiredFrame::release`] or when the frame is dropped.

use crate::frame::FrameBuffers;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Producer of raw frames, typically a camera binding
pub trait FrameSource: Send {
    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<FrameBuffers>;
}

impl FrameSource for Box<dyn FrameSource> {
    fn next_frame(&mut self) -> Result<FrameBuffers> {
        (**self).next_frame()
    }
}

#[derive(Debug)]
struct Shared {
    in_flight: Mutex<usize>,
    released: Condvar,
    stop: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_one(&self) {
        let mut in_flight = self.lock();
        *in_flight = in_flight.saturating_sub(1);
        self.released.notify_all();
    }
}

/// Claim on one of the in-flight slots
#[derive(Debug)]
pub struct FrameLease {
    shared: Option<Arc<Shared>>,
}

impl FrameLease {
    fn release_inner(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release_one();
        }
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// A frame handed out by [`Acquisition`]
#[derive(Debug)]
pub struct AcquiredFrame {
    pub buffers: FrameBuffers,
    lease: FrameLease,
}

impl AcquiredFrame {
    /// Return the frame's slot to the acquisition thread
    pub fn release(mut self) {
        self.lease.release_inner();
    }
}

/// Running acquisition thread
pub struct Acquisition {
    receiver: Receiver<AcquiredFrame>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<Result<()>>>,
    max_in_flight: usize,
}

impl Acquisition {
    /// Spawn the acquisition thread
    ///
    /// # Errors
    ///
    /// Returns an error if `max_in_flight` is zero or the thread cannot be spawned
    pub fn start<S>(source: S, max_in_flight: usize) -> Result<Self>
    where
        S: FrameSource + 'static,
    {
        if max_in_flight == 0 {
            return Err(Error::InvalidInput(
                "At least one frame must be allowed in flight".to_string(),
            ));
        }

        let shared = Arc::new(Shared {
            in_flight: Mutex::new(0),
            released: Condvar::new(),
            stop: AtomicBool::new(false),
        });
        let (sender, receiver) = mpsc::sync_channel(max_in_flight);

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("frame-acquisition".to_string())
            .spawn(move || acquire_loop(source, &worker_shared, &sender, max_in_flight))
            .map_err(|e| Error::Acquisition(format!("Failed to spawn acquisition thread: {e}")))?;

        info!("Acquisition started with at most {} frames in flight", max_in_flight);
        Ok(Self {
            receiver,
            shared,
            handle: Some(handle),
            max_in_flight,
        })
    }

    /// Wait up to `timeout` for the next frame
    ///
    /// Returns `None` on timeout or once the acquisition thread has ended
    /// and all queued frames were taken.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AcquiredFrame> {
        match self.receiver.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take the next frame if one is queued
    #[must_use]
    pub fn try_recv(&self) -> Option<AcquiredFrame> {
        match self.receiver.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Frames acquired but not yet released
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.shared.lock()
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Whether the acquisition thread is still producing
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop acquisition, join the thread and release all queued frames
    ///
    /// Frames still held by the caller keep their lease until released or
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns the error that ended acquisition early, if any
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        {
            let _guard = self.shared.lock();
            self.shared.stop.store(true, Ordering::SeqCst);
            self.shared.released.notify_all();
        }

        let outcome = handle
            .join()
            .map_err(|_| Error::Acquisition("Acquisition thread panicked".to_string()))
            .and_then(|result| result);

        let mut drained = 0;
        while let Ok(frame) = self.receiver.try_recv() {
            frame.release();
            drained += 1;
        }

        let outstanding = self.in_flight();
        if outstanding > 0 {
            warn!("Acquisition stopped with {} frames still held by the consumer", outstanding);
        }
        info!("Acquisition stopped, released {} queued frames", drained);
        outcome
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Acquisition ended with error: {}", e);
        }
    }
}

fn acquire_loop<S: FrameSource>(
    mut source: S,
    shared: &Arc<Shared>,
    sender: &SyncSender<AcquiredFrame>,
    max_in_flight: usize,
) -> Result<()> {
    loop {
        {
            let mut in_flight = shared.lock();
            while *in_flight >= max_in_flight && !shared.stop.load(Ordering::SeqCst) {
                debug!("{} frames in flight, withholding capture", *in_flight);
                in_flight = shared
                    .released
                    .wait(in_flight)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if shared.stop.load(Ordering::SeqCst) {
                return Ok(());
            }
            *in_flight += 1;
        }

        // The slot is claimed before capture so a failing source must hand it back
        let lease = FrameLease {
            shared: Some(Arc::clone(shared)),
        };
        let buffers = match source.next_frame() {
            Ok(buffers) => buffers,
            Err(e) => {
                drop(lease);
                warn!("Frame source failed: {}", e);
                return Err(e);
            }
        };

        if sender.send(AcquiredFrame { buffers, lease }).is_err() {
            debug!("Frame receiver dropped, ending acquisition");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Orientation;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    struct CountingSource {
        produced: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    impl FrameSource for CountingSource {
        fn next_frame(&mut self) -> Result<FrameBuffers> {
            let n = self.produced.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| n >= limit) {
                return Err(Error::Acquisition("camera unplugged".to_string()));
            }
            Ok(FrameBuffers::zeros(2, 2, Orientation::CANONICAL))
        }
    }

    fn wait_until(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_in_flight_frames_are_bounded() {
        let produced = Arc::new(AtomicUsize::new(0));
        let acquisition = Acquisition::start(
            CountingSource {
                produced: Arc::clone(&produced),
                fail_after: None,
            },
            3,
        )
        .unwrap();

        assert!(wait_until(|| acquisition.in_flight() == 3));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(produced.load(Ordering::SeqCst), 3);

        let frame = acquisition.recv_timeout(Duration::from_secs(1)).unwrap();
        frame.release();
        assert!(wait_until(|| produced.load(Ordering::SeqCst) == 4));
        assert_eq!(acquisition.in_flight(), 3);

        acquisition.stop().unwrap();
    }

    #[test]
    fn test_dropping_frame_releases_lease() {
        let produced = Arc::new(AtomicUsize::new(0));
        let acquisition = Acquisition::start(
            CountingSource {
                produced: Arc::clone(&produced),
                fail_after: None,
            },
            1,
        )
        .unwrap();

        let frame = acquisition.recv_timeout(Duration::from_secs(1)).unwrap();
        drop(frame);
        assert!(acquisition.recv_timeout(Duration::from_secs(1)).is_some());
        acquisition.stop().unwrap();
    }

    #[test]
    fn test_stop_releases_queued_frames() {
        let produced = Arc::new(AtomicUsize::new(0));
        let acquisition = Acquisition::start(
            CountingSource {
                produced: Arc::clone(&produced),
                fail_after: None,
            },
            3,
        )
        .unwrap();
        assert!(wait_until(|| acquisition.in_flight() == 3));

        let shared = Arc::clone(&acquisition.shared);
        acquisition.stop().unwrap();
        assert_eq!(*shared.lock(), 0);
    }

    #[test]
    fn test_source_error_is_returned_from_stop() {
        let produced = Arc::new(AtomicUsize::new(0));
        let acquisition = Acquisition::start(
            CountingSource {
                produced: Arc::clone(&produced),
                fail_after: Some(1),
            },
            3,
        )
        .unwrap();

        assert!(wait_until(|| !acquisition.is_running()));
        assert!(matches!(acquisition.stop(), Err(Error::Acquisition(_))));
    }

    #[test]
    fn test_zero_in_flight_rejected() {
        let source = CountingSource {
            produced: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
        };
        assert!(Acquisition::start(source, 0).is_err());
    }
}
