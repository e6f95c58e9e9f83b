//! Console output: one decimal sample per line, `\n` terminated. Works with anything that
//! implements `embedded_io::Write`, eg a UART.

use embedded_io::Write;

use crate::error::Result;

/// Write samples to `w`, one per line, in order. Returns the number of samples written.
pub fn write_samples<W, I>(w: &mut W, samples: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = i16>,
{
    let mut count = 0;

    for sample in samples {
        writeln!(w, "{}", sample)?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use embedded_io::{ErrorKind, ErrorType};

    use super::*;
    use crate::error::Error;

    /// Accepts at most `cap` bytes, then reports a broken pipe.
    struct Capped {
        out: Vec<u8>,
        cap: usize,
    }

    impl ErrorType for Capped {
        type Error = ErrorKind;
    }

    impl Write for Capped {
        fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, ErrorKind> {
            let room = self.cap - self.out.len();
            if room == 0 {
                return Err(ErrorKind::BrokenPipe);
            }
            let n = buf.len().min(room);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> core::result::Result<(), ErrorKind> {
            Ok(())
        }
    }

    #[test]
    fn one_integer_per_line() {
        let mut out = Capped {
            out: Vec::new(),
            cap: usize::MAX,
        };

        let n = write_samples(&mut out, [0, -5, 32_767, i16::MIN]).unwrap();

        assert_eq!(n, 4);
        assert_eq!(out.out, b"0\n-5\n32767\n-32768\n");
    }

    #[test]
    fn nothing_to_write() {
        let mut out = Capped {
            out: Vec::new(),
            cap: usize::MAX,
        };
        assert_eq!(write_samples(&mut out, []), Ok(0));
        assert!(out.out.is_empty());
    }

    #[test]
    fn write_failure_surfaces() {
        let mut out = Capped {
            out: Vec::new(),
            cap: 4,
        };

        let result = write_samples(&mut out, [1, 2, 3]);

        assert_eq!(result, Err(Error::SinkError(ErrorKind::BrokenPipe)));
        assert_eq!(out.out, b"1\n2\n");
    }
}
