#[cfg(unix)]
mod pty_passthrough {
    use std::error::Error;
    use std::io::{Read, Write};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use sheath::pty::PtySession;

    struct InteractivePty {
        session: PtySession,
        writer: Option<Box<dyn Write + Send>>,
        output: Arc<Mutex<Vec<u8>>>,
        reader_handle: thread::JoinHandle<()>,
    }

    impl InteractivePty {
        fn spawn_shell(cols: u16, rows: u16) -> Result<Self, Box<dyn Error>> {
            let mut session = PtySession::spawn("sh", &[], cols, rows)?;
            let mut reader = session.take_reader().ok_or("reader taken")?;
            let writer = session.take_writer().ok_or("writer taken")?;

            let output = Arc::new(Mutex::new(Vec::new()));
            let output_clone = Arc::clone(&output);
            let reader_handle = thread::spawn(move || {
                let mut buffer = [0u8; 1024];
                loop {
                    match reader.read(&mut buffer) {
                        Ok(0) => break,
                        Ok(count) => {
                            if let Ok(mut output) = output_clone.lock() {
                                output.extend_from_slice(&buffer[..count]);
                            }
                        }
                        Err(_) => break,
                    }
                }
            });

            Ok(Self {
                session,
                writer: Some(writer),
                output,
                reader_handle,
            })
        }

        fn write_line(&mut self, line: &str) -> Result<(), Box<dyn Error>> {
            if let Some(writer) = &mut self.writer {
                writer.write_all(line.as_bytes())?;
                writer.flush()?;
            }
            Ok(())
        }

        fn wait_for_output(&self, needle: &str, timeout: Duration) -> bool {
            let deadline = Instant::now() + timeout;
            while Instant::now() < deadline {
                if let Ok(output) = self.output.lock() {
                    let text = String::from_utf8_lossy(&output);
                    if text.contains(needle) {
                        return true;
                    }
                }
                thread::sleep(Duration::from_millis(20));
            }
            false
        }

        fn shutdown(mut self) -> Result<(), Box<dyn Error>> {
            self.writer.take();
            let status = self.session.wait()?;
            let _ = self.reader_handle.join();
            assert!(status.success());
            Ok(())
        }
    }

    #[test]
    fn spawn_command_captures_output() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn(
            "sh",
            &["-c".to_string(), "printf 'ready'".to_string()],
            80,
            24,
        )?;
        let mut reader = session.take_reader().ok_or("reader taken")?;
        drop(session.take_writer());

        let mut output = Vec::new();
        reader.read_to_end(&mut output)?;
        let status = session.wait()?;
        assert!(status.success());
        assert!(String::from_utf8_lossy(&output).contains("ready"));
        Ok(())
    }

    #[test]
    fn input_echoes_back() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn("cat", &[], 80, 24)?;
        let mut reader = session.take_reader().ok_or("reader taken")?;
        let mut writer = session.take_writer().ok_or("writer taken")?;

        writer.write_all(b"ping\n")?;
        writer.flush()?;
        drop(writer);

        let mut output = Vec::new();
        let mut buf = [0u8; 256];
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(count) => {
                    output.extend_from_slice(&buf[..count]);
                    if String::from_utf8_lossy(&output).contains("ping") {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        assert!(String::from_utf8_lossy(&output).contains("ping"));
        let _ = session.kill();
        let _ = session.wait();
        Ok(())
    }

    #[test]
    fn resize_updates_shell_size() -> Result<(), Box<dyn Error>> {
        let mut session = InteractivePty::spawn_shell(80, 24)?;
        session.write_line("stty size\n")?;
        assert!(session.wait_for_output("24 80", Duration::from_secs(5)));

        session.session.resize(100, 40)?;
        session.write_line("stty size\n")?;
        assert!(session.wait_for_output("40 100", Duration::from_secs(5)));

        session.write_line("exit\n")?;
        session.shutdown()?;
        Ok(())
    }

    #[test]
    fn exit_status_is_propagated() -> Result<(), Box<dyn Error>> {
        let mut session =
            PtySession::spawn("sh", &["-c".to_string(), "exit 7".to_string()], 80, 24)?;
        let status = session.wait()?;
        assert!(!status.success());
        assert_eq!(status.exit_code(), 7);
        Ok(())
    }
}
