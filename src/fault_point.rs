//! Fault point injection for durability testing
//!
//! A fault point is a named location in the persistence path. When armed,
//! reaching it returns an injected I/O error instead of continuing, which
//! lets tests observe the cleanup path of a failed write.
//!
//! Points are armed either per thread with `arm` (tests) or for the whole
//! process with the `GEOREF_FAULT_POINT` environment variable.
//!
//! ```ignore
//! fault_point::arm(fault_point::points::SNAPSHOT_TEMP_WRITE);
//! assert!(store.commit(&lock, &records).is_err());
//! fault_point::disarm();
//! ```

use std::cell::RefCell;
use std::io;
use std::sync::OnceLock;

pub const ENV_VAR: &str = "GEOREF_FAULT_POINT";

static ENV_POINT: OnceLock<Option<String>> = OnceLock::new();

thread_local! {
    static ARMED: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn env_point() -> Option<&'static str> {
    ENV_POINT
        .get_or_init(|| std::env::var(ENV_VAR).ok())
        .as_deref()
}

/// Arm `name` on the current thread, replacing any armed point.
pub fn arm(name: &str) {
    ARMED.with(|armed| *armed.borrow_mut() = Some(name.to_string()));
}

/// Disarm the current thread's fault point.
pub fn disarm() {
    ARMED.with(|armed| *armed.borrow_mut() = None);
}

/// Whether `name` is armed on this thread or through the environment.
pub fn is_armed(name: &str) -> bool {
    let thread_armed = ARMED.with(|armed| armed.borrow().as_deref() == Some(name));
    thread_armed || env_point() == Some(name)
}

/// Fail with an injected error if `name` is armed. No-op otherwise.
#[inline]
pub fn check(name: &str) -> io::Result<()> {
    if is_armed(name) {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("injected fault at {}", name),
        ));
    }
    Ok(())
}

/// All defined fault point names
pub mod points {
    /// After the temp file is created, before its content is written
    pub const SNAPSHOT_TEMP_CREATE: &str = "snapshot_temp_create";
    /// After the content is written, before fsync
    pub const SNAPSHOT_TEMP_WRITE: &str = "snapshot_temp_write";
    /// After fsync, before the rename over the target
    pub const SNAPSHOT_BEFORE_RENAME: &str = "snapshot_before_rename";
    /// After the rename, before the directory fsync
    pub const SNAPSHOT_DIR_SYNC: &str = "snapshot_dir_sync";
    /// Before the backup copy starts
    pub const BACKUP_COPY: &str = "backup_copy";

    pub fn all() -> &'static [&'static str] {
        &[
            SNAPSHOT_TEMP_CREATE,
            SNAPSHOT_TEMP_WRITE,
            SNAPSHOT_BEFORE_RENAME,
            SNAPSHOT_DIR_SYNC,
            BACKUP_COPY,
        ]
    }
}
