//! Line-oriented TCP echo pair. A plain request/response demo over a
//! reliable stream, kept fully separate from the datagram protocol; no
//! retries, no framing, no loss handling.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use tracing::info;

/// Line the client types to end its session. Never sent to the server.
pub const EXIT_SENTINEL: &str = "exit";

/// Echo every newline-delimited line back to the client until it hangs up.
pub fn serve_connection(stream: TcpStream) -> io::Result<()> {
    let peer = stream.peer_addr()?;
    info!("client connected: {}", peer);
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        info!("received from {}: {}", peer, line);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    info!("client disconnected: {}", peer);
    Ok(())
}

/// Serve clients one at a time, echoing until each disconnects.
pub fn run_server(bind: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(bind)?;
    info!("echo server listening on {}", listener.local_addr()?);
    for stream in listener.incoming() {
        serve_connection(stream?)?;
    }
    Ok(())
}

/// Send each input line to the server and copy the response to `output`.
/// The exit sentinel ends the session without being sent; so does a server
/// disconnect.
pub fn run_client<I, O>(server: SocketAddr, input: I, output: &mut O) -> io::Result<()>
where
    I: BufRead,
    O: Write,
{
    let stream = TcpStream::connect(server)?;
    info!("connected to {}", server);
    let mut writer = stream.try_clone()?;
    let mut responses = BufReader::new(stream);
    for line in input.lines() {
        let line = line?;
        if line == EXIT_SENTINEL {
            break;
        }
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        let mut reply = String::new();
        if responses.read_line(&mut reply)? == 0 {
            info!("server disconnected");
            break;
        }
        output.write_all(reply.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::thread;

    fn spawn_single_serve() -> (SocketAddr, thread::JoinHandle<io::Result<()>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept()?;
            serve_connection(stream)
        });
        (addr, handle)
    }

    #[test]
    fn lines_echo_back_verbatim() {
        let (addr, server) = spawn_single_serve();
        let stream = TcpStream::connect(addr).unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        writer.write_all(b"hello\n").unwrap();
        let mut reply = String::new();
        reader.read_line(&mut reply).unwrap();
        assert_eq!(reply, "hello\n");

        writer.write_all(b"second line\n").unwrap();
        reply.clear();
        reader.read_line(&mut reply).unwrap();
        assert_eq!(reply, "second line\n");

        drop(writer);
        drop(reader);
        server.join().unwrap().unwrap();
    }

    #[test]
    fn exit_sentinel_ends_the_session_unsent() {
        let (addr, server) = spawn_single_serve();
        let input = Cursor::new("ping\nexit\nnever sent\n");
        let mut output = Vec::new();
        run_client(addr, input, &mut output).unwrap();
        assert_eq!(output, b"ping\n");
        server.join().unwrap().unwrap();
    }

    #[test]
    fn empty_input_just_disconnects() {
        let (addr, server) = spawn_single_serve();
        let mut output = Vec::new();
        run_client(addr, Cursor::new(""), &mut output).unwrap();
        assert!(output.is_empty());
        server.join().unwrap().unwrap();
    }
}
