use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

use zipdex::{
    ArchiveSource, Error, HeaderError, HttpSource, MultiDexContainer, MultiDexFile, Opcodes,
    ReadAt, ZipDexContainer,
};

/// Largest body the test server sends for one range, so bigger reads need
/// several requests.
const MAX_CHUNK: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// HEAD advertises byte ranges, GET honors them with 206
    Ranges,
    /// HEAD leaves out `Accept-Ranges`
    NoAcceptRanges,
    /// HEAD advertises byte ranges, but GET ignores the range and sends 200
    IgnoresRange,
    /// Every range comes back as an empty 206
    EmptyRanges,
    /// HEAD fails with 404
    Missing,
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

fn read_request(stream: &TcpStream) -> std::io::Result<(String, Option<(u64, u64)>)> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let method = request_line
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();

    let mut range = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("range") {
                range = parse_range(value.trim());
            }
        }
    }
    Ok((method, range))
}

fn respond(
    mut stream: &TcpStream,
    status: &str,
    headers: &[(&str, String)],
    body: &[u8],
) -> std::io::Result<()> {
    let mut head = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("Connection: close\r\n\r\n");
    stream.write_all(head.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}

fn handle(stream: &TcpStream, data: &[u8], mode: Mode) -> std::io::Result<()> {
    let (method, range) = read_request(stream)?;
    let len = data.len() as u64;

    match (method.as_str(), range) {
        ("HEAD", _) if mode == Mode::Missing => {
            respond(stream, "404 Not Found", &[("Content-Length", "0".into())], &[])
        }
        ("HEAD", _) => {
            let mut headers = vec![("Content-Length", len.to_string())];
            if mode != Mode::NoAcceptRanges {
                headers.push(("Accept-Ranges", "bytes".into()));
            }
            respond(stream, "200 OK", &headers, &[])
        }
        ("GET", _) if mode == Mode::EmptyRanges => respond(
            stream,
            "206 Partial Content",
            &[("Content-Length", "0".into())],
            &[],
        ),
        ("GET", Some((start, end))) if mode == Mode::Ranges && start < len => {
            let stop = (end.min(len - 1) + 1).min(start + MAX_CHUNK);
            let body = &data[start as usize..stop as usize];
            let headers = [
                ("Content-Length", body.len().to_string()),
                ("Content-Range", format!("bytes {}-{}/{}", start, stop - 1, len)),
            ];
            respond(stream, "206 Partial Content", &headers, body)
        }
        ("GET", _) => respond(
            stream,
            "200 OK",
            &[("Content-Length", len.to_string())],
            data,
        ),
        _ => respond(
            stream,
            "405 Method Not Allowed",
            &[("Content-Length", "0".into())],
            &[],
        ),
    }
}

/// Serve `data` on a loopback port until the test process exits.
fn serve(data: Vec<u8>, mode: Mode) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let _ = handle(&stream, &data, mode);
        }
    });
    format!("http://{}/app.apk", addr)
}

fn source(url: String) -> HttpSource {
    HttpSource::new(url)
        .timeout(Duration::from_secs(5))
        .max_retry(1)
}

fn dex_bytes(version: &[u8; 3], body_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; 0x70 + body_len];
    buf[0..4].copy_from_slice(b"dex\n");
    buf[4..7].copy_from_slice(version);
    let len = buf.len() as u32;
    buf[32..36].copy_from_slice(&len.to_le_bytes());
    buf[36..40].copy_from_slice(&0x70u32.to_le_bytes());
    buf[40..44].copy_from_slice(&0x12345678u32.to_le_bytes());
    for (i, b) in buf[0x70..].iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    buf
}

fn apk() -> (Vec<u8>, Vec<u8>) {
    let classes2 = dex_bytes(b"039", 4096);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in [
        ("classes.dex", dex_bytes(b"035", 64)),
        ("resources.arsc", vec![0x02, 0x00, 0x0c, 0x00, 0x10, 0x20]),
        ("classes2.dex", classes2.clone()),
    ] {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        writer.start_file(name, options).unwrap();
        writer.write_all(&data).unwrap();
    }
    (writer.finish().unwrap().into_inner(), classes2)
}

fn container(url: String) -> ZipDexContainer<HttpSource> {
    ZipDexContainer::with_source(source(url), Arc::new(Opcodes::for_api(28)))
}

#[test]
fn test_http_listing_and_loading() {
    let (bytes, classes2) = apk();
    let url = serve(bytes, Mode::Ranges);
    let container = container(url.clone());

    assert!(container.is_zip_file());
    assert_eq!(
        container.dex_entry_names().unwrap(),
        ["classes.dex", "classes2.dex"]
    );

    // Larger than one server chunk, so the reader has to keep requesting
    let file = container.entry("classes2.dex").unwrap().unwrap();
    assert_eq!(file.entry_name(), "classes2.dex");
    assert_eq!(file.buf(), classes2.as_slice());

    match container.entry("resources.arsc") {
        Err(Error::NotADexFile { reason, .. }) => {
            assert!(matches!(reason, HeaderError::NotDex(_)))
        }
        other => panic!("expected NotADexFile, got {:?}", other),
    }
    assert!(container.entry("missing.dex").unwrap().is_none());
}

#[test]
fn test_http_reads_are_clamped_to_size() {
    let data: Vec<u8> = (0..2000u32).map(|i| (i % 256) as u8).collect();
    let url = serve(data.clone(), Mode::Ranges);
    let reader = source(url).open().unwrap();
    assert_eq!(reader.size(), 2000);

    let mut buf = [0u8; 16];
    assert_eq!(reader.read_at(2000, &mut buf).unwrap(), 0);
    assert_eq!(reader.read_at(5000, &mut buf).unwrap(), 0);
    assert_eq!(reader.read_at(0, &mut []).unwrap(), 0);

    assert_eq!(reader.read_at(1996, &mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], &data[1996..]);

    let mut buf = vec![0u8; 1500];
    reader.read_exact_at(100, &mut buf).unwrap();
    assert_eq!(buf, &data[100..1600]);
}

#[test]
fn test_http_without_range_support() {
    let (bytes, _) = apk();
    let container = container(serve(bytes, Mode::NoAcceptRanges));

    assert!(!container.is_zip_file());
    match container.dex_entry_names() {
        Err(Error::Io(e)) => assert!(e.to_string().contains("Range"), "{}", e),
        other => panic!("expected I/O error, got {:?}", other),
    }
}

#[test]
fn test_http_server_ignoring_range() {
    let (bytes, _) = apk();
    let container = container(serve(bytes, Mode::IgnoresRange));

    assert!(!container.is_zip_file());
    match container.dex_entry_names() {
        Err(Error::Io(e)) => assert!(e.to_string().contains("200"), "{}", e),
        other => panic!("expected I/O error, got {:?}", other),
    }
}

#[test]
fn test_http_empty_range() {
    let (bytes, _) = apk();
    let container = container(serve(bytes, Mode::EmptyRanges));

    assert!(!container.is_zip_file());
    match container.entry("classes.dex") {
        Err(Error::Io(e)) => assert!(e.to_string().contains("empty range"), "{}", e),
        other => panic!("expected I/O error, got {:?}", other),
    }
}

#[test]
fn test_http_missing_archive() {
    let container = container(serve(Vec::new(), Mode::Missing));

    assert!(!container.is_zip_file());
    match container.dex_entry_names() {
        Err(Error::Io(e)) => assert!(e.to_string().contains("404"), "{}", e),
        other => panic!("expected I/O error, got {:?}", other),
    }
}
