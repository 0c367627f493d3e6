//! Session log watcher
//!
//! Tails the session log file from a dedicated background thread and
//! pushes complete lines to the UI thread for display. The watcher only
//! ever reads; it never touches selection state and needs no
//! synchronization with the core. A missing or unreadable log file
//! degrades to an empty view.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Background tail of one log file
pub struct LogWatcher {
    rx: Receiver<String>,
    lines: Vec<String>,
    capacity: usize,
}

impl LogWatcher {
    /// Spawns the watcher thread. The thread exits on its own once the
    /// receiving side is dropped.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || watch(path, tx));
        Self {
            rx,
            lines: Vec::new(),
            capacity: 500,
        }
    }

    /// Folds newly arrived lines into the display buffer, keeping only the
    /// most recent `capacity` lines. Call once per frame.
    pub fn poll(&mut self) {
        for line in self.rx.try_iter() {
            self.lines.push(line);
        }
        if self.lines.len() > self.capacity {
            let excess = self.lines.len() - self.capacity;
            self.lines.drain(..excess);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn watch(path: PathBuf, tx: Sender<String>) {
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            warn!("log file {} not watchable: {err}", path.display());
            return;
        }
    };
    let mut reader = BufReader::new(file);
    if reader.seek(SeekFrom::Start(0)).is_err() {
        return;
    }

    let mut buffer = String::new();
    loop {
        buffer.clear();
        match reader.read_line(&mut buffer) {
            Ok(0) => thread::sleep(POLL_INTERVAL),
            Ok(_) => {
                let line = buffer.trim_end_matches(['\n', '\r']).to_string();
                if tx.send(line).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!("log watch read error: {err}");
                return;
            }
        }
    }
}
