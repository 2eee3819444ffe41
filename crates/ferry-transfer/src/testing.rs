//! Fault-injecting store wrapper for tests.

use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use ferry_scope::Scope;
use ferry_store::{
    InMemoryObjectStore, ObjectInfo, ObjectReader, ObjectStore, ObjectWriter, StoreError,
    StoreResult,
};
use ferry_types::{DownloadOptions, UploadOptions};

#[derive(Clone, Copy, Debug)]
pub(crate) enum Fault {
    /// Every commit fails; the upload is aborted.
    Commit,
    /// Writes fail once more than this many bytes would have been accepted.
    WriteAfter(u64),
    /// Reads fail once this many bytes were returned.
    ReadAfter(u64),
    /// Every read and write sleeps first.
    Delay(Duration),
}

pub(crate) struct FaultyStore {
    inner: InMemoryObjectStore,
    fault: Fault,
    on_open: Mutex<Option<Sender<()>>>,
}

impl FaultyStore {
    pub(crate) fn new(inner: InMemoryObjectStore, fault: Fault) -> Self {
        Self {
            inner,
            fault,
            on_open: Mutex::new(None),
        }
    }

    /// Signal `tx` once a stream has been opened.
    pub(crate) fn notify_on_open(self, tx: Sender<()>) -> Self {
        *self.on_open.lock().expect("lock poisoned") = Some(tx);
        self
    }

    fn opened(&self) {
        if let Some(tx) = self.on_open.lock().expect("lock poisoned").take() {
            let _ = tx.send(());
        }
    }
}

impl ObjectStore for FaultyStore {
    fn open_read(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &DownloadOptions,
    ) -> StoreResult<Box<dyn ObjectReader>> {
        let inner = self.inner.open_read(scope, bucket, key, options)?;
        self.opened();
        Ok(Box::new(FaultyReader {
            inner,
            fault: self.fault,
            read: 0,
        }))
    }

    fn open_write(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        let inner = self.inner.open_write(scope, bucket, key, options)?;
        self.opened();
        Ok(Box::new(FaultyWriter {
            inner,
            fault: self.fault,
        }))
    }

    fn stat(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo> {
        self.inner.stat(bucket, key)
    }
}

struct FaultyReader {
    inner: Box<dyn ObjectReader>,
    fault: Fault,
    read: u64,
}

impl ObjectReader for FaultyReader {
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<usize> {
        match self.fault {
            Fault::Delay(d) => thread::sleep(d),
            Fault::ReadAfter(limit) if self.read >= limit => {
                return Err(StoreError::Backend("injected read failure".into()));
            }
            _ => {}
        }
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }

    fn info(&self) -> &ObjectInfo {
        self.inner.info()
    }

    fn remaining(&self) -> u64 {
        self.inner.remaining()
    }
}

struct FaultyWriter {
    inner: Box<dyn ObjectWriter>,
    fault: Fault,
}

impl ObjectWriter for FaultyWriter {
    fn write(&mut self, data: &[u8]) -> StoreResult<usize> {
        match self.fault {
            Fault::Delay(d) => thread::sleep(d),
            Fault::WriteAfter(limit) if self.inner.written() + data.len() as u64 > limit => {
                return Err(StoreError::Backend("injected write failure".into()));
            }
            _ => {}
        }
        self.inner.write(data)
    }

    fn written(&self) -> u64 {
        self.inner.written()
    }

    fn commit(self: Box<Self>) -> StoreResult<ObjectInfo> {
        if let Fault::Commit = self.fault {
            self.inner.abort()?;
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        self.inner.commit()
    }

    fn abort(self: Box<Self>) -> StoreResult<()> {
        self.inner.abort()
    }
}
