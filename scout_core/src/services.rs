// scout_core/src/services.rs

//! Background output workers (sound and speech), each draining a bounded queue
//! on its own thread so mission code never blocks on audio.

use crossbeam_channel::{bounded, Sender};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

// --- Sinks ---

/// A single beep request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: u32,
    pub duration: Duration,
    pub volume: u8,
}

/// Output device for tones. Runs on the sound worker thread.
pub trait ToneSink: Send {
    fn play_tone(&mut self, tone: Tone);
}

/// Output device for spoken text. Runs on the speech worker thread.
pub trait SpeechSink: Send {
    fn say(&mut self, text: &str);
}

// --- Generic queue worker ---

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    drained: Condvar,
}

/// One consumer thread fed by a bounded channel.
///
/// `busy` stays true from the moment an item is submitted until the consumer
/// has finished every queued item; `flush` blocks until then.
pub struct QueueWorker<T: Send + 'static> {
    name: String,
    sender: Option<Sender<T>>,
    pending: Arc<Pending>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> QueueWorker<T> {
    pub fn spawn(
        name: &str,
        capacity: usize,
        mut handler: impl FnMut(T) + Send + 'static,
    ) -> io::Result<Self> {
        let (sender, receiver) = bounded::<T>(capacity.max(1));
        let pending = Arc::new(Pending::default());
        let consumer = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for item in receiver.iter() {
                    handler(item);
                    let mut count = consumer.count.lock();
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        consumer.drained.notify_all();
                    }
                }
            })?;
        debug!("Started {name} worker (queue capacity: {})", capacity.max(1));
        Ok(Self {
            name: name.to_string(),
            sender: Some(sender),
            pending,
            handle: Some(handle),
        })
    }

    /// Queues `item`, blocking while the queue is full.
    ///
    /// # Returns
    /// `false` if the consumer thread is gone and the item was dropped.
    pub fn submit(&self, item: T) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        *self.pending.count.lock() += 1;
        if sender.send(item).is_err() {
            let mut count = self.pending.count.lock();
            *count = count.saturating_sub(1);
            return false;
        }
        true
    }

    pub fn busy(&self) -> bool {
        *self.pending.count.lock() > 0
    }

    /// Blocks until every submitted item has been handled.
    pub fn flush(&self) {
        let mut count = self.pending.count.lock();
        while *count > 0 {
            self.pending.drained.wait(&mut count);
        }
    }
}

impl<T: Send + 'static> Drop for QueueWorker<T> {
    fn drop(&mut self) {
        // Closing the channel ends the consumer loop once it has drained.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("{} worker panicked", self.name);
            }
        }
    }
}

// --- Concrete workers ---

pub struct SoundWorker {
    queue: QueueWorker<Tone>,
}

impl SoundWorker {
    pub fn spawn(mut sink: impl ToneSink + 'static) -> io::Result<Self> {
        let queue = QueueWorker::spawn("sound", 16, move |tone| sink.play_tone(tone))?;
        Ok(Self { queue })
    }

    pub fn play_tone(&self, frequency: u32, duration: Duration, volume: u8) {
        self.queue.submit(Tone {
            frequency,
            duration,
            volume,
        });
    }

    pub fn busy(&self) -> bool {
        self.queue.busy()
    }

    pub fn flush(&self) {
        self.queue.flush();
    }
}

pub struct SpeechWorker {
    queue: QueueWorker<String>,
}

impl SpeechWorker {
    pub fn spawn(mut sink: impl SpeechSink + 'static) -> io::Result<Self> {
        let queue = QueueWorker::spawn("speech", 16, move |text: String| sink.say(&text))?;
        Ok(Self { queue })
    }

    pub fn say(&self, text: impl Into<String>) {
        self.queue.submit(text.into());
    }

    pub fn busy(&self) -> bool {
        self.queue.busy()
    }

    pub fn flush(&self) {
        self.queue.flush();
    }
}
