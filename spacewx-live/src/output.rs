//! Output backends for published snapshots.

use std::path::PathBuf;

use spacewx_types::LiveState;
use tokio::sync::mpsc;

/// Output destination for snapshots.
///
/// Outputs receive the new [`LiveState`] after every tick that changed it.
#[derive(Debug)]
pub enum Output {
    /// Write snapshots to a JSON file.
    ///
    /// The file is overwritten with each snapshot.
    File(PathBuf),

    /// Send snapshots through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<LiveState>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use spacewx_live::Output;
    ///
    /// let output = Output::file("live.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use spacewx_live::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive snapshots
    /// // while let Some(state) = rx.recv().await {
    /// //     println!("Kp now: {:?}", state.kp_now);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<LiveState>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Emit a snapshot to this output.
    pub(crate) async fn emit(&self, state: &LiveState) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(state)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Channel(tx) => {
                // Best effort send (don't block if channel is full)
                let _ = tx.try_send(state.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_output_writes_published_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.json");
        let output = Output::file(&path);

        let mut state = LiveState::initial();
        state.kp_now = Some(3.0);
        state.loading = false;
        output.emit(&state).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["kpNow"], 3.0);
        assert_eq!(written["loading"], false);
    }

    #[tokio::test]
    async fn channel_output_does_not_block_when_full() {
        let (output, mut rx) = Output::channel(1);
        let state = LiveState::initial();

        output.emit(&state).await.unwrap();
        output.emit(&state).await.unwrap();

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn file_output_reports_io_errors() {
        let output = Output::file("/nonexistent-dir/live.json");
        assert!(output.emit(&LiveState::initial()).await.is_err());
    }
}
