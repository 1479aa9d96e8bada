//! Best-effort command delivery without a control protocol
//!
//! When RCON is not available the server process is an opaque console.
//! This module injects command lines into it through whichever of several
//! imperfect mechanisms currently works: keystrokes into a console
//! multiplexer session, a direct write to the attached stdin stream, or a
//! drop file in a spool directory consumed by an external watcher. Each
//! mechanism is a capability probe plus a delivery attempt; the
//! [`FallbackSender`] walks them in priority order.

use crate::channel::ProcessChannel;
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, trace};

pub mod scrape;
mod sender;

pub use sender::{FallbackSender, MechanismProbe};

/// One way of getting a command line into the server process
#[async_trait]
pub trait DeliveryMechanism: Send + Sync {
    /// Short name used in logs and probe reports
    fn name(&self) -> &'static str;

    /// Whether the mechanism currently looks usable. A failing probe
    /// reports unavailable rather than erroring.
    async fn probe(&self) -> bool;

    /// Attempt to deliver one command line.
    async fn deliver(&self, command: &str) -> Result<()>;
}

/// Keystroke injection into a console multiplexer session
pub struct SessionInjection {
    channel: Arc<dyn ProcessChannel>,
    session: String,
}

impl SessionInjection {
    /// Target the configured session name on the given channel
    pub fn new(channel: Arc<dyn ProcessChannel>, session: String) -> Self {
        Self { channel, session }
    }

    /// Resolve the configured name against the live session list.
    ///
    /// Multiplexer setups commonly suffix instance ids, so `mc` also
    /// matches `mc-1`. Exactly one match is required; anything else makes
    /// this mechanism unavailable rather than guessing.
    async fn resolve_session(&self) -> Result<String> {
        let sessions = self.channel.list_console_sessions().await?;
        let prefix = format!("{}-", self.session);
        let mut matches = sessions
            .into_iter()
            .filter(|s| *s == self.session || s.starts_with(&prefix));

        match (matches.next(), matches.next()) {
            (Some(name), None) => Ok(name),
            (None, _) => Err(ConsoleError::DeliveryUnavailable(format!(
                "no console session matching '{}'",
                self.session
            ))),
            (Some(_), Some(_)) => Err(ConsoleError::DeliveryUnavailable(format!(
                "multiple console sessions match '{}'",
                self.session
            ))),
        }
    }
}

#[async_trait]
impl DeliveryMechanism for SessionInjection {
    fn name(&self) -> &'static str {
        "session_injection"
    }

    async fn probe(&self) -> bool {
        if !self.channel.is_running().await.unwrap_or(false) {
            return false;
        }
        match self.resolve_session().await {
            Ok(_) => true,
            Err(e) => {
                trace!(error = %e, "session injection unavailable");
                false
            }
        }
    }

    async fn deliver(&self, command: &str) -> Result<()> {
        let session = self.resolve_session().await?;
        self.channel
            .send_console_keys(session.clone(), command.to_string())
            .await?;
        debug!(session = %session, "command injected into console session");
        Ok(())
    }
}

/// Direct write to the process's attached stdin stream
pub struct StreamWrite {
    channel: Arc<dyn ProcessChannel>,
}

impl StreamWrite {
    /// Write through the given channel
    pub fn new(channel: Arc<dyn ProcessChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl DeliveryMechanism for StreamWrite {
    fn name(&self) -> &'static str {
        "stream_write"
    }

    async fn probe(&self) -> bool {
        self.channel.is_running().await.unwrap_or(false)
    }

    async fn deliver(&self, command: &str) -> Result<()> {
        let mut line = command.as_bytes().to_vec();
        line.push(b'\n');
        self.channel.write_stdin(line).await
    }
}

static DROP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Drop-file handoff into a spool directory watched externally
pub struct DropFile {
    spool_dir: PathBuf,
}

impl DropFile {
    /// Hand commands off under the given spool directory
    pub fn new(spool_dir: PathBuf) -> Self {
        Self { spool_dir }
    }

    fn unique_name() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = DROP_SEQ.fetch_add(1, Ordering::Relaxed);
        format!("cmd-{nanos}-{seq}.txt")
    }
}

#[async_trait]
impl DeliveryMechanism for DropFile {
    fn name(&self) -> &'static str {
        "drop_file"
    }

    async fn probe(&self) -> bool {
        // The watcher owns the directory; its absence means nothing is
        // consuming drop files.
        match fs::metadata(&self.spool_dir).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => false,
        }
    }

    async fn deliver(&self, command: &str) -> Result<()> {
        let name = Self::unique_name();
        let tmp = self.spool_dir.join(format!(".{name}.part"));
        let dest = self.spool_dir.join(&name);

        fs::write(&tmp, format!("{command}\n")).await?;
        // Rename within the directory keeps half-written files invisible
        // to the watcher.
        fs::rename(&tmp, &dest).await?;
        debug!(file = %dest.display(), "command handed off to spool directory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockProcessChannel;

    #[tokio::test]
    async fn test_session_injection_resolves_exact_match() {
        let mut mock = MockProcessChannel::new();
        mock.expect_is_running().returning(|| Ok(true));
        mock.expect_list_console_sessions()
            .returning(|| Ok(vec!["other".to_string(), "mc".to_string()]));

        let mechanism = SessionInjection::new(Arc::new(mock), "mc".to_string());
        assert!(mechanism.probe().await);
        assert_eq!(mechanism.resolve_session().await.unwrap(), "mc");
    }

    #[tokio::test]
    async fn test_session_injection_resolves_suffixed_match() {
        let mut mock = MockProcessChannel::new();
        mock.expect_list_console_sessions()
            .returning(|| Ok(vec!["mc-1".to_string()]));

        let mechanism = SessionInjection::new(Arc::new(mock), "mc".to_string());
        assert_eq!(mechanism.resolve_session().await.unwrap(), "mc-1");
    }

    #[tokio::test]
    async fn test_session_injection_ambiguous_is_unavailable() {
        let mut mock = MockProcessChannel::new();
        mock.expect_is_running().returning(|| Ok(true));
        mock.expect_list_console_sessions()
            .returning(|| Ok(vec!["mc".to_string(), "mc-1".to_string()]));

        let mechanism = SessionInjection::new(Arc::new(mock), "mc".to_string());
        assert!(!mechanism.probe().await);
        assert!(matches!(
            mechanism.deliver("say hi").await,
            Err(ConsoleError::DeliveryUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_session_injection_unavailable_when_stopped() {
        let mut mock = MockProcessChannel::new();
        mock.expect_is_running().returning(|| Ok(false));
        // list_console_sessions must not be called for a stopped container
        mock.expect_list_console_sessions().times(0);

        let mechanism = SessionInjection::new(Arc::new(mock), "mc".to_string());
        assert!(!mechanism.probe().await);
    }

    #[tokio::test]
    async fn test_stream_write_appends_newline() {
        let mut mock = MockProcessChannel::new();
        mock.expect_write_stdin()
            .withf(|data| data == b"say hi\n")
            .times(1)
            .returning(|_| Ok(()));

        let mechanism = StreamWrite::new(Arc::new(mock));
        mechanism.deliver("say hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_file_probe_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        let present = DropFile::new(dir.path().to_path_buf());
        assert!(present.probe().await);

        let missing = DropFile::new(dir.path().join("not-there"));
        assert!(!missing.probe().await);
    }

    #[tokio::test]
    async fn test_drop_file_writes_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let mechanism = DropFile::new(dir.path().to_path_buf());

        mechanism.deliver("say one").await.unwrap();
        mechanism.deliver("say two").await.unwrap();

        let mut contents = Vec::new();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let path = entry.unwrap().path();
            assert!(!path
                .file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with(".part"));
            contents.push(std::fs::read_to_string(path).unwrap());
        }
        contents.sort();
        assert_eq!(contents, vec!["say one\n", "say two\n"]);
    }
}
