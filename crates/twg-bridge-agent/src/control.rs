//! Operator control lines.
//!
//! The agent reads commands from standard input, one per line:
//!
//! ```text
//! set <device_id> <out> <on|off>
//! ```

use std::io::{BufRead, BufReader};
use tokio::sync::mpsc;

/// Request to switch one output of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    /// Target device
    pub device_id: String,
    /// Output index
    pub out: u32,
    /// Requested state
    pub on: bool,
}

/// Parse one control line.
///
/// # Errors
///
/// Returns a human-readable message for malformed lines.
pub fn parse_line(line: &str) -> Result<OutputRequest, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts.as_slice() {
        ["set", device_id, out, state] => {
            let out = out
                .parse()
                .map_err(|_| format!("invalid output index '{out}'"))?;
            let on = parse_switch(state).ok_or_else(|| format!("invalid state '{state}'"))?;
            Ok(OutputRequest {
                device_id: (*device_id).to_string(),
                out,
                on,
            })
        }
        _ => Err(format!("unrecognised command '{}'", line.trim())),
    }
}

/// Parse an on/off word.
#[must_use]
pub fn parse_switch(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Spawn a reader forwarding parsed stdin lines.
///
/// The channel closes when stdin reaches end of file.
pub fn spawn_stdin_reader() -> mpsc::Receiver<OutputRequest> {
    spawn_line_reader(BufReader::new(std::io::stdin()))
}

/// Forward parsed lines of `reader` on a detached thread.
///
/// A read blocked on the source never holds up runtime shutdown; the
/// thread ends with the process, at end of input, or once the receiver
/// is dropped.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<OutputRequest>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    let spawned = std::thread::Builder::new()
        .name("twg-control".to_string())
        .spawn(move || forward_lines(reader, &tx));
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Failed to start control reader");
    }

    rx
}

fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<OutputRequest>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read control input");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(request) => {
                if tx.blocking_send(request).is_err() {
                    return;
                }
            }
            Err(err) => tracing::warn!(error = %err, "Ignored control line"),
        }
    }

    tracing::debug!("Control input closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_set_line() {
        assert_eq!(
            parse_line("set dev1 3 on"),
            Ok(OutputRequest {
                device_id: "dev1".to_string(),
                out: 3,
                on: true,
            })
        );
        assert_eq!(parse_line("  set dev1 12 OFF ").map(|r| r.on), Ok(false));
    }

    #[test]
    fn reject_malformed_lines() {
        assert!(parse_line("set dev1 three on").is_err());
        assert!(parse_line("set dev1 3 maybe").is_err());
        assert!(parse_line("toggle dev1 3").is_err());
        assert!(parse_line("set dev1 3").is_err());
    }

    /// Reader whose first read blocks until the sender is dropped.
    struct Stalled(std::sync::mpsc::Receiver<()>);

    impl std::io::Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    #[tokio::test]
    async fn forwards_valid_lines_until_end_of_input() {
        let input = "set a 1 on\n\nbogus\nset b 2 off\n";
        let mut rx = spawn_line_reader(std::io::Cursor::new(input));

        let first = rx.recv().await.unwrap();
        assert_eq!((first.device_id.as_str(), first.out, first.on), ("a", 1, true));
        let second = rx.recv().await.unwrap();
        assert_eq!((second.device_id.as_str(), second.out, second.on), ("b", 2, false));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn runtime_shuts_down_while_input_is_open() {
        let (hold, stalled) = std::sync::mpsc::channel();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let rx = runtime.block_on(async { spawn_line_reader(BufReader::new(Stalled(stalled))) });

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(rx);
            drop(runtime);
            let _ = done_tx.send(());
        });

        assert!(done_rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .is_ok());
        drop(hold);
    }
}
