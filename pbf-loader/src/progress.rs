use std::io::{self, Read};

/// Default reporting interval: 64 MiB
pub const DEFAULT_INTERVAL: u64 = 64 * 1024 * 1024;

/// Reader wrapper that calls `callback` with the running byte count each time
/// another `interval` bytes have been read. A read crossing several intervals
/// reports once per crossed interval.
#[derive(Debug)]
pub struct ProgressReader<R, F>
where
    R: Read,
    F: FnMut(u64),
{
    inner: R,
    callback: F,
    interval: u64,
    total_read: u64,
    next_report: u64,
}

impl<R, F> ProgressReader<R, F>
where
    R: Read,
    F: FnMut(u64),
{
    /// An `interval` of 0 selects `DEFAULT_INTERVAL`.
    pub fn new(inner: R, interval: u64, callback: F) -> Self {
        let interval = if interval == 0 { DEFAULT_INTERVAL } else { interval };
        Self {
            inner,
            callback,
            interval,
            total_read: 0,
            next_report: interval,
        }
    }

    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    fn report(&mut self) {
        while self.total_read >= self.next_report {
            (self.callback)(self.total_read);
            match self.next_report.checked_add(self.interval) {
                Some(next) => self.next_report = next,
                None => {
                    self.next_report = u64::MAX;
                    break;
                }
            }
        }
    }
}

impl<R, F> Read for ProgressReader<R, F>
where
    R: Read,
    F: FnMut(u64),
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.total_read = self.total_read.saturating_add(n as u64);
            self.report();
        }
        Ok(n)
    }
}
