//! The seam between the engine and whatever is actually running the
//! Minecraft server process: a console, a plugin loader, a supervisor.

/// Everything the engine needs from its host to drive a snapshot or
/// restore: running console commands, talking back to the requester, and
/// stopping/starting the server process around a restore.
///
/// Implementations are expected to be cheap to clone or otherwise share
/// across worker threads; the engine never assumes it owns the only handle.
pub trait HostAdapter: Send + Sync {
    /// Run one console command on the host server, e.g. `save-off`.
    fn execute(&self, command: &str);

    /// Send a message to every player plus the console.
    fn broadcast(&self, message: &str);

    /// Reply to whoever triggered the in-flight operation (a player or the
    /// console), as opposed to broadcasting to everyone.
    fn reply(&self, message: &str);

    /// Structured log line, independent of in-game chat.
    fn log(&self, message: &str);

    /// Stop the server process. Must not return until the process has
    /// actually exited, since a restore overwrites region files on disk.
    fn stop_server(&self) -> std::io::Result<()>;

    /// Start the server process back up after a restore.
    fn start_server(&self) -> std::io::Result<()>;

    /// Invoked by the host once it has observed the server process exit,
    /// for hosts where [`HostAdapter::stop_server`] only requests a stop
    /// asynchronously rather than blocking on it.
    fn on_server_stopped(&self) {}

    /// Invoked by the host when a console line matching one of the
    /// `data_getter` regexes arrives, so the coordinator can resolve a
    /// pending wait without polling.
    fn on_info(&self, _line: &str) {}

    /// Translate a message key to the requester's locale, falling back to
    /// the key itself if no translation exists. Hosts without
    /// localization support may return `key` verbatim.
    fn tr(&self, key: &str) -> String {
        key.to_string()
    }
}
