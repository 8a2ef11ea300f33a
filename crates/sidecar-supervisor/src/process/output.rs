use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::OUTPUT_TARGET;
use crate::classifier::LogClassifier;
use crate::status::StatusHub;

/// Drains `source` on a named thread, publishing classified lines as notes.
///
/// The thread ends on end-of-file or the first read error. It is never
/// joined; the caller may drop the returned handle.
pub(crate) fn spawn_reader(
    stream: &'static str,
    source: Box<dyn Read + Send>,
    classifier: Arc<LogClassifier>,
    hub: Arc<StatusHub>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("sidecar-{stream}"))
        .spawn(move || drain_lines(stream, source, &classifier, &hub))
}

fn drain_lines(
    stream: &str,
    source: Box<dyn Read + Send>,
    classifier: &LogClassifier,
    hub: &StatusHub,
) {
    let mut reader = BufReader::new(source);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                let line = line.trim_end();
                debug!(target: OUTPUT_TARGET, stream, line, "backend output");
                if let Some(message) = classifier.classify(line) {
                    hub.note(message);
                }
            }
            Err(error) => {
                debug!(target: OUTPUT_TARGET, stream, %error, "backend output reader stopped");
                break;
            }
        }
    }
    debug!(target: OUTPUT_TARGET, stream, "backend output closed");
}
