use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};

/// Surface a decoder writes stream data into.
#[async_trait]
pub trait RenderTarget: Send + Sync {
    /// False once the surface has been torn down; nothing may connect to it.
    fn is_attached(&self) -> bool;

    async fn render(&self, chunk: &[u8]) -> io::Result<()>;
}

/// Records the raw MPEG-TS feed to a file.
pub struct FileTarget {
    path: PathBuf,
    attached: AtomicBool,
    file: Mutex<File>,
}

impl FileTarget {
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;

        Ok(Self {
            path,
            attached: AtomicBool::new(true),
            file: Mutex::new(file),
        })
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

#[async_trait]
impl RenderTarget for FileTarget {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    async fn render(&self, chunk: &[u8]) -> io::Result<()> {
        if !self.is_attached() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{} is detached", self.path.display()),
            ));
        }

        let mut file = self.file.lock().await;
        file.write_all(chunk).await?;
        file.flush().await
    }
}

/// Accepts and drops the feed, counting bytes.
#[derive(Debug)]
pub struct DiscardTarget {
    attached: AtomicBool,
    rendered: AtomicU64,
}

impl DiscardTarget {
    pub fn new() -> Self {
        Self {
            attached: AtomicBool::new(true),
            rendered: AtomicU64::new(0),
        }
    }

    pub fn bytes_rendered(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

impl Default for DiscardTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RenderTarget for DiscardTarget {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    async fn render(&self, chunk: &[u8]) -> io::Result<()> {
        if !self.is_attached() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "render target is detached",
            ));
        }
        self.rendered.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}
