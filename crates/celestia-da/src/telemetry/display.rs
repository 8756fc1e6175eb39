//! Utilities to emit fields using their [`std::fmt::Display`] implementation.
use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    io,
    str,
};

/// Format `bytes` as lower-cased hex.
///
/// # Example
/// ```
/// use celestia_da::telemetry::display;
/// let namespace = [0u8, 0, 0x63, 0x65];
/// tracing::info!(namespace = %display::hex(&namespace), "publishing blobs");
/// ```
pub fn hex<T: AsRef<[u8]> + ?Sized>(bytes: &T) -> Hex<'_> {
    Hex(bytes.as_ref())
}

/// A newtype wrapper of a byte slice that implements [`std::fmt::Display`].
///
/// To be used in tracing contexts. See the [`self::hex`] utility.
pub struct Hex<'a>(&'a [u8]);

impl Display for Hex<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Format `serializable` as JSON.
///
/// # Example
/// ```
/// use celestia_da::telemetry::display;
/// let config = serde_json::json!({"namespace": "0000000000000000000063656c6573746961"});
/// tracing::info!(config = %display::json(&config), "starting");
/// ```
pub fn json<T>(serializable: &T) -> Json<'_, T>
where
    T: serde::Serialize,
{
    Json(serializable)
}

/// A newtype wrapper of a serializable type that implements [`std::fmt::Display`].
///
/// To be used in tracing contexts. See the [`self::json`] utility. A value that fails to
/// serialize is reported as a formatting error instead of panicking.
pub struct Json<'a, T>(&'a T);

impl<T> Display for Json<'_, T>
where
    T: serde::Serialize,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        struct WriterFormatter<'a, 'b> {
            inner: &'a mut Formatter<'b>,
        }

        impl io::Write for WriterFormatter<'_, '_> {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                let s = str::from_utf8(buf)
                    .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
                self.inner
                    .write_str(s)
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "fmt error"))?;
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut wr = WriterFormatter {
            inner: f,
        };
        serde_json::to_writer(&mut wr, self.0).map_err(|_| fmt::Error)
    }
}
