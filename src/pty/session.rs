use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use portable_pty::{native_pty_system, Child, CommandBuilder, ExitStatus, MasterPty, PtySize};
use uuid::Uuid;

use crate::error::SessionError;

pub type SharedMaster = Arc<Mutex<Box<dyn MasterPty + Send>>>;

/// One wrapped shell invocation: the master/slave pty pair and the child
/// process spawned with the slave as its controlling terminal.
pub struct PtySession {
    id: Uuid,
    master: SharedMaster,
    child: Box<dyn Child + Send + Sync>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Option<Box<dyn Write + Send>>,
}

impl PtySession {
    /// Allocate a pty pair and spawn `command` on the slave side.
    ///
    /// Nothing here touches the real terminal: allocation or spawn
    /// failure aborts the wrap attempt before raw mode is ever entered.
    pub fn spawn(
        command: &str,
        args: &[String],
        cols: u16,
        rows: u16,
    ) -> Result<Self, SessionError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(SessionError::PtyAllocate)?;

        let mut cmd = CommandBuilder::new(command);
        cmd.args(args);
        cmd.cwd(std::env::current_dir()?);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|source| SessionError::Spawn {
                command: command.to_string(),
                source,
            })?;
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(SessionError::PtyAllocate)?;
        let writer = pair
            .master
            .take_writer()
            .map_err(SessionError::PtyAllocate)?;

        Ok(Self {
            id: Uuid::new_v4(),
            master: Arc::new(Mutex::new(pair.master)),
            child,
            reader: Some(reader),
            writer: Some(writer),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Shared master handle for resize application.
    pub fn master(&self) -> SharedMaster {
        Arc::clone(&self.master)
    }

    /// The master's output stream. Can be taken once.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// The master's input stream. Can be taken once.
    pub fn take_writer(&mut self) -> Option<Box<dyn Write + Send>> {
        self.writer.take()
    }

    /// Propagate new dimensions onto the pty slave.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), SessionError> {
        self.master
            .lock()
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(SessionError::Resize)
    }

    /// Block until the child terminates, reaping it.
    pub fn wait(&mut self) -> Result<ExitStatus, SessionError> {
        Ok(self.child.wait()?)
    }

    /// Forcibly terminate the child.
    pub fn kill(&mut self) -> io::Result<()> {
        self.child.kill()
    }
}

/// Write `bytes` fully, retrying when the descriptor reports busy.
/// Backpressure from a slow child is a retry condition, not an error.
pub fn write_retrying<W: Write + ?Sized>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < bytes.len() {
        match writer.write(&bytes[written..]) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => continue,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    writer.flush()
}
