use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::AuditConfig;

/// Append-only text log of movie activity. Writes are serialized.
#[derive(Debug)]
pub struct AuditLog {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), lock: Mutex::new(()) }
    }

    /// Accepts entries and drops them
    pub fn disabled() -> Self {
        Self { path: None, lock: Mutex::new(()) }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        if config.enabled {
            Self::new(&config.log_path)
        } else {
            Self::disabled()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn append(&self, entry: &str) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _guard = self.lock.lock().await;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), entry);
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("audit-{}-{}", name, uuid::Uuid::new_v4()))
            .join("Log.txt")
    }

    #[tokio::test]
    async fn appends_lines_and_creates_directories() {
        let path = temp_path("append");
        let log = AuditLog::new(&path);
        log.append("first").await.unwrap();
        log.append("second").await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
    }

    #[tokio::test]
    async fn concurrent_writes_keep_whole_lines() {
        let path = temp_path("concurrent");
        let log = Arc::new(AuditLog::new(&path));
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move { log.append(&format!("entry {}", i)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 20);
        assert!(contents.lines().all(|l| l.contains("] entry ")));
    }

    #[tokio::test]
    async fn disabled_log_writes_nothing() {
        let log = AuditLog::disabled();
        assert!(log.append("ignored").await.is_ok());
        assert!(log.path().is_none());
    }
}
