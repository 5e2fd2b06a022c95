//! The per-client logging hook.

use std::fmt;
use std::sync::Arc;

/// A formatted-log callback invoked before each registry call.
///
/// The hook receives one pre-formatted line such as
/// `registry.tags url=https://r.example.com/v2/app/tags/list repository=app`.
/// It is a configuration option of the client, not a global.
///
/// # Example
///
/// ```rust
/// use registry_client::LogHook;
/// use std::sync::{Arc, Mutex};
///
/// let lines = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&lines);
/// let hook = LogHook::new(move |line| sink.lock().unwrap().push(line.to_string()));
///
/// hook.log("registry.ping url=https://r.example.com/v2/");
/// assert_eq!(lines.lock().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct LogHook(Arc<dyn Fn(&str) + Send + Sync>);

impl LogHook {
    /// Wraps a custom callback.
    pub fn new(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(callback))
    }

    /// Discards every message.
    #[must_use]
    pub fn quiet() -> Self {
        Self::new(|_| {})
    }

    /// Forwards messages to the process-wide `tracing` subscriber at INFO.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|line| tracing::info!(target: "registry_client", "{line}"))
    }

    /// Emits one line.
    pub fn log(&self, line: &str) {
        (self.0)(line);
    }

    /// Emits `<operation> url=<url> key=value ...` for one network call.
    pub fn call(&self, operation: &str, url: &str, fields: &[(&str, &str)]) {
        let mut line = format!("{operation} url={url}");
        for (key, value) in fields {
            line.push_str(&format!(" {key}={value}"));
        }
        self.log(&line);
    }
}

impl Default for LogHook {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for LogHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogHook(..)")
    }
}
