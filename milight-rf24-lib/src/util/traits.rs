use tokio::sync::mpsc;

/// Stream of CRLF-delimited lines read from the bridge, delimiters stripped.
pub type LineReceiver = mpsc::UnboundedReceiver<String>;

/// The link between the controller and the bridge board.
///
/// All methods are called from the controller task only; writes are small
/// (one packet at a time) and may block briefly.
pub trait Transport: Send + 'static {
    /// Opens the link. A successful return is the "ready" signal; the
    /// returned receiver yields every line the bridge sends from then on.
    fn open(&mut self) -> anyhow::Result<LineReceiver>;

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()>;

    /// Blocks until everything written so far has left the host.
    fn flush(&mut self) -> anyhow::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> anyhow::Result<LineReceiver> {
        (**self).open()
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        (**self).flush()
    }
}
