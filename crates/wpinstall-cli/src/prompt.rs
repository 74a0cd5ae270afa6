use std::io::{BufRead, Write};
use std::sync::mpsc;
use std::time::Duration;

pub const TOKEN_PROMPT_TIMEOUT: Duration = Duration::from_secs(20);

/// Ask for a GitHub token on stderr and wait at most `timeout` for a line on
/// stdin. An empty line, end of input or a timeout all mean "no token".
pub fn prompt_git_token(timeout: Duration) -> Option<String> {
    eprint!(
        "Please enter Git access token, or proceed without which might cause rate limit issues:\n > "
    );
    let _ = std::io::stderr().flush();
    let token = read_line_with_timeout(std::io::BufReader::new(std::io::stdin()), timeout);
    if token.is_none() {
        eprintln!();
    }
    token
}

/// Read one line on a helper thread. On timeout the thread is left blocked
/// on the reader; it ends with the process.
pub fn read_line_with_timeout<R>(mut reader: R, timeout: Duration) -> Option<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if reader.read_line(&mut line).is_ok() {
            let _ = tx.send(line);
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(line) => {
            let line = line.trim();
            (!line.is_empty()).then(|| line.to_string())
        }
        Err(_) => {
            tracing::debug!("no token entered within {}s", timeout.as_secs());
            None
        }
    }
}
