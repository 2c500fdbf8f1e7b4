use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use image::{Rgba, RgbaImage};

use crate::fetch::Fetcher;
use crate::key::{PackedCursor, ScrambleKey};

/// Key with the given geometry and identity order (tile `i` lands in cell
/// `i`). Tests permute `order` as needed.
pub fn make_key(
    width: u32,
    height: u32,
    x_slices: u32,
    y_slices: u32,
    slice_width: u32,
    slice_height: u32,
) -> ScrambleKey {
    ScrambleKey {
        width,
        height,
        x_slices,
        y_slices,
        slice_width,
        slice_height,
        order: (0..x_slices * y_slices).collect(),
    }
}

/// Image where every pixel encodes its own coordinates, so a misplaced tile
/// shows up as a mismatched pixel value.
pub fn coordinate_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([x as u8, y as u8, (x.wrapping_add(y) % 256) as u8, 255])
    })
}

/// Build the scrambled bitmap a server would serve for `original` under
/// `key`: the inverse of reassembly. Walks `order` exactly like the repair
/// pass, but copies destination tiles out of `original` into their packed
/// source positions.
pub fn scramble(original: &RgbaImage, key: &ScrambleKey) -> RgbaImage {
    let mut packed = RgbaImage::new(key.width, key.height);
    let mut cursor = PackedCursor::new();
    for &s in &key.order {
        let row = s / key.x_slices;
        let col = s % key.x_slices;
        let (w, h) = key.tile_size(row, col);
        let (sx, sy) = cursor.next_origin(key.category(row, col), key);
        let dx = col * key.slice_width;
        let dy = row * key.slice_height;
        for y in 0..h {
            for x in 0..w {
                packed.put_pixel(sx + x, sy + y, *original.get_pixel(dx + x, dy + y));
            }
        }
    }
    packed
}

/// Fetcher wired for loopback tests: recognizable User-Agent, short timeouts.
pub fn test_fetcher() -> Fetcher {
    Fetcher::new(
        "test-agent/1.0",
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
}

/// Spin up a loopback listener serving `responses` to sequential requests,
/// one connection each. Returns the server's URL and a join handle yielding
/// the request heads in arrival order.
pub fn serve_responses(responses: Vec<Vec<u8>>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for response in &responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request(&stream));
            stream.write_all(response).unwrap();
        }
        requests
    });
    (url, handle)
}

/// Like [`serve_responses`], but for clients that request in no fixed order:
/// each connection gets the first unused response whose needle appears in
/// the request head, and unmatched requests get a 404.
pub fn serve_routes(
    mut routes: Vec<(&'static str, Vec<u8>)>,
) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        let total = routes.len();
        for _ in 0..total {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&stream);
            let response = match routes.iter().position(|(needle, _)| request.contains(needle)) {
                Some(i) => routes.remove(i).1,
                None => http_not_found(),
            };
            stream.write_all(&response).unwrap();
            requests.push(request);
        }
        requests
    });
    (url, handle)
}

/// Canned response with `Connection: close`, so the client opens a fresh
/// connection for its next request instead of reusing the socket.
pub fn http_response(status: &str, body: &[u8]) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}

pub fn http_ok(body: &[u8]) -> Vec<u8> {
    http_response("200 OK", body)
}

pub fn http_not_found() -> Vec<u8> {
    http_response("404 Not Found", b"")
}

/// Read one request head (through the blank line) off the stream.
fn read_request(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request = String::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).unwrap() == 0 || line.trim().is_empty() {
            break;
        }
        request.push_str(&line);
    }
    request
}
