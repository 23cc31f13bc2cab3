use std::{
    io,
    mem::size_of,
    os::fd::{AsRawFd, FromRawFd, OwnedFd},
    ptr::null,
    time::Duration,
};

use libc::{EAGAIN, EFD_CLOEXEC, EFD_NONBLOCK, POLLIN};
use log::warn;

/// Thread parker backed by an `eventfd`.
///
/// Any thread may call [Notifier::notify]; only the executor thread calls
/// [Notifier::wait].
pub(crate) struct Notifier {
    fd: OwnedFd,
}

impl Notifier {
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };

        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    pub fn notify(&self) {
        let val: u64 = 1;
        let ret = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                &val as *const u64 as *const _,
                size_of::<u64>(),
            )
        };

        if ret == -1 {
            let err = io::Error::last_os_error();

            // A saturated counter still wakes the reader.
            if err.raw_os_error() != Some(EAGAIN) {
                warn!("failed to signal executor: {err}");
            }
        }
    }

    /// Park until notified or until `timeout` elapses. `None` waits
    /// indefinitely.
    pub fn wait(&self, timeout: Option<Duration>) {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: POLLIN,
            revents: 0,
        };

        let tspec = timeout.map(|d| libc::timespec {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as _,
            tv_nsec: d.subsec_nanos() as _,
        });

        let tptr: *const libc::timespec = tspec.as_ref().map_or(null(), |t| t as *const _);

        let ret = unsafe { libc::ppoll(&mut pfd, 1, tptr, null()) };

        if ret == -1 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                warn!("ppoll on executor eventfd failed: {err}");
            }
            return;
        }

        if ret > 0 {
            self.drain();
        }
    }

    fn drain(&self) {
        let mut val: u64 = 0;

        unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut val as *mut u64 as *mut _,
                size_of::<u64>(),
            )
        };
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    use super::Notifier;

    #[test]
    fn wait_times_out() {
        let n = Notifier::new().unwrap();
        let before = Instant::now();

        n.wait(Some(Duration::from_millis(50)));

        assert!(before.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn pending_notification_returns_immediately() {
        let n = Notifier::new().unwrap();
        n.notify();
        n.notify();

        let before = Instant::now();
        n.wait(Some(Duration::from_secs(5)));
        assert!(before.elapsed() < Duration::from_secs(1));

        // Drained: the next wait must time out.
        let before = Instant::now();
        n.wait(Some(Duration::from_millis(50)));
        assert!(before.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn cross_thread_notify() {
        let n = Arc::new(Notifier::new().unwrap());
        let n2 = n.clone();

        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            n2.notify();
        });

        let before = Instant::now();
        n.wait(None);
        assert!(before.elapsed() < Duration::from_secs(5));

        t.join().unwrap();
    }
}
