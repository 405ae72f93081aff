//! Framed connections and the accept loop.
//!
//! Each frame is a 4-byte big-endian length followed by one serialized
//! message. A connection reads requests on its own thread and hands them to
//! the op processor; responses may be written from any worker, so the writer
//! half sits behind a mutex.

use std::io::{self, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, warn};

use crate::io::MessageSerializer;
use super::context::{Connection, Context, ServerState};
use super::message::{ResponseMessage, ResponseStatusCode};
use super::processor::TraversalOpProcessor;

/// Frames larger than this are rejected.
pub const MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

static NEXT_CONNECTION_ID: AtomicUsize = AtomicUsize::new(1);

/// Read one frame. `Ok(None)` on a clean end of stream.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

pub fn write_frame<W: Write>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    if data.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Message too large: {} bytes", data.len()),
        ));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes())?;
    writer.write_all(data)?;
    writer.flush()
}

/// Writes serialized responses as frames.
pub struct FramedConnection<W: Write + Send> {
    writer: Mutex<W>,
    serializer: MessageSerializer,
}

impl<W: Write + Send> FramedConnection<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer), serializer: MessageSerializer::new() }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Connection for FramedConnection<W> {
    fn write_and_flush(&self, response: ResponseMessage) -> io::Result<()> {
        let bytes = self
            .serializer
            .serialize_response(&response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        write_frame(&mut *writer, &bytes)
    }
}

/// Read requests from `reader` until end of stream, answering on
/// `connection`. A frame that does not decode gets a malformed-request
/// reply and reading continues.
pub fn serve_connection<R: Read>(
    mut reader: R,
    connection: Arc<dyn Connection>,
    processor: &TraversalOpProcessor,
    state: &Arc<ServerState>,
) -> io::Result<()> {
    let serializer = MessageSerializer::new();

    while let Some(frame) = read_frame(&mut reader)? {
        let request = match serializer.deserialize_request(&mut frame.as_slice()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Could not decode request");
                let response = ResponseMessage::build_for(serializer.peek_request_id(&frame))
                    .code(ResponseStatusCode::RequestErrorMalformedRequest)
                    .status_message(format!("Invalid request: {}", e))
                    .create();
                connection.write_and_flush(response)?;
                continue;
            }
        };

        if !request.processor.is_empty() && request.processor != TraversalOpProcessor::NAME {
            let response = ResponseMessage::build(&request)
                .code(ResponseStatusCode::RequestErrorMalformedRequest)
                .status_message(format!("Invalid OpProcessor requested [{}]", request.processor))
                .create();
            connection.write_and_flush(response)?;
            continue;
        }

        debug!(request_id = %request.request_id, op = %request.op, "Received request");
        processor.process(Context::new(request, Arc::clone(&connection), Arc::clone(state)));
    }
    Ok(())
}

/// Unix socket server: one reader thread per client.
pub struct Server {
    listener: UnixListener,
    processor: Arc<TraversalOpProcessor>,
    state: Arc<ServerState>,
}

impl Server {
    pub fn bind(
        path: impl AsRef<Path>,
        processor: Arc<TraversalOpProcessor>,
        state: Arc<ServerState>,
    ) -> io::Result<Self> {
        let listener = UnixListener::bind(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Listening");
        Ok(Self { listener, processor, state })
    }

    /// Accept clients until the listener fails.
    pub fn run(&self) -> io::Result<()> {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "Accept error");
                    continue;
                }
            };
            if let Err(e) = spawn_client(stream, Arc::clone(&self.processor), Arc::clone(&self.state)) {
                warn!(error = %e, "Could not clone client stream");
            }
        }
        Ok(())
    }
}

/// Start the reader thread for one accepted client.
fn spawn_client(
    stream: UnixStream,
    processor: Arc<TraversalOpProcessor>,
    state: Arc<ServerState>,
) -> io::Result<thread::JoinHandle<()>> {
    let writer = stream.try_clone()?;
    let client_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::SeqCst);

    Ok(thread::spawn(move || {
        info!(client_id, "Client connected");
        let connection: Arc<dyn Connection> = Arc::new(FramedConnection::new(writer));
        match serve_connection(stream, connection, &processor, &state) {
            Ok(()) => info!(client_id, "Client disconnected"),
            Err(e) => warn!(client_id, error = %e, "Client connection closed with error"),
        }
    }))
}
