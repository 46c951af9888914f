//! Source images: fetching, decoding and identity.
//!
//! A [`SourceImage`] is decoded once and never mutated. Its pixels sit behind
//! an `Arc` so history entries, the session and export batches can share one
//! decode. Identity is content-addressed: [`SourceId`] is a truncated SHA-256
//! of the encoded bytes, so reloading the same file yields the same id.
//!
//! ## Origins
//!
//! Images fetched from another origin may be drawable but not readable
//! (the browser-style "tainted canvas"). That is recorded on the image as
//! [`SourceOrigin::Remote`] with `readable: false`; preview rendering still
//! works, and the export orchestrator refuses to read the pixels back.
//! Readability is part of [`SourceId`], so the same bytes loaded once from
//! disk and once from an unreadable origin are two distinct sources.
//!
//! ## Providers
//!
//! | Provider | Locations |
//! |---|---|
//! | [`FileSource`] | local paths |
//! | [`HttpSource`] | `http://` and `https://` URLs, via `ureq` |
//! | [`LocationSource`] | either, chosen by the location's scheme |

use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest response body [`HttpSource`] accepts by default.
pub const DEFAULT_MAX_REMOTE_BYTES: u64 = 32 * 1024 * 1024;

/// Default timeout for one remote fetch.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("remote fetch is not available for {0}")]
    RemoteUnavailable(String),
    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

/// Content hash of an encoded source image, plus whether its pixels may be
/// read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId {
    digest: String,
    readable: bool,
}

impl SourceId {
    /// Id of readable bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        Self {
            digest: hex,
            readable: true,
        }
    }

    /// Id of bytes fetched from `origin`.
    pub fn for_origin(bytes: &[u8], origin: &SourceOrigin) -> Self {
        Self {
            readable: origin.is_readable(),
            ..Self::from_bytes(bytes)
        }
    }

    /// The truncated content hash.
    pub fn as_str(&self) -> &str {
        &self.digest
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.readable {
            f.write_str(&self.digest)
        } else {
            write!(f, "{} (cross-origin)", self.digest)
        }
    }
}

/// Where the encoded bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    Local(PathBuf),
    Remote { url: String, readable: bool },
    Memory,
}

impl SourceOrigin {
    /// Whether pixels drawn from this origin may be read back (encoded).
    pub fn is_readable(&self) -> bool {
        match self {
            SourceOrigin::Local(_) | SourceOrigin::Memory => true,
            SourceOrigin::Remote { readable, .. } => *readable,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceOrigin::Local(path) => path.display().to_string(),
            SourceOrigin::Remote { url, .. } => url.clone(),
            SourceOrigin::Memory => "<memory>".to_string(),
        }
    }
}

/// Encoded bytes plus where they came from, as yielded by an [`ImageSource`].
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub origin: SourceOrigin,
}

/// A decoded, immutable source raster.
#[derive(Debug, Clone)]
pub struct SourceImage {
    id: SourceId,
    pixels: Arc<RgbaImage>,
    origin: SourceOrigin,
}

impl SourceImage {
    /// Decode encoded bytes (PNG, JPEG, WebP, TIFF).
    pub fn decode(fetched: FetchedImage) -> Result<Self, SourceError> {
        let FetchedImage { bytes, origin } = fetched;
        let decoded = image::load_from_memory(&bytes).map_err(|e| {
            SourceError::Decode(format!("{}: {}", origin.describe(), e))
        })?;
        let pixels = decoded.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(SourceError::Decode(format!(
                "{}: image has no pixels",
                origin.describe()
            )));
        }
        let id = SourceId::for_origin(&bytes, &origin);
        info!(
            id = %id,
            width = pixels.width(),
            height = pixels.height(),
            "source image decoded"
        );
        Ok(Self {
            id,
            pixels: Arc::new(pixels),
            origin,
        })
    }

    /// Wrap an already-decoded raster.
    pub fn from_rgba(pixels: RgbaImage, origin: SourceOrigin) -> Self {
        let id = SourceId::for_origin(pixels.as_raw(), &origin);
        Self {
            id,
            pixels: Arc::new(pixels),
            origin,
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_readable(&self) -> bool {
        self.origin.is_readable()
    }
}

/// Provider of encoded image bytes (file picker, URL fetch, ...).
pub trait ImageSource {
    fn fetch(&self, location: &str) -> Result<FetchedImage, SourceError>;
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Reads images from the local filesystem.
///
/// URL locations are refused with [`SourceError::RemoteUnavailable`]; use
/// [`HttpSource`] or [`LocationSource`] for those.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl ImageSource for FileSource {
    fn fetch(&self, location: &str) -> Result<FetchedImage, SourceError> {
        if is_remote(location) {
            return Err(SourceError::RemoteUnavailable(location.to_string()));
        }
        let path = Path::new(location);
        debug!(path = %path.display(), "reading source image");
        let bytes = std::fs::read(path)?;
        Ok(FetchedImage {
            bytes,
            origin: SourceOrigin::Local(path.to_path_buf()),
        })
    }
}

/// Fetches images over HTTP(S) with a blocking `ureq` agent.
///
/// With a `page_origin` set the fetch behaves like an anonymous CORS
/// request from that origin: the image is readable when it is same-origin
/// or the response's `Access-Control-Allow-Origin` admits the page. Without
/// one every fetched image is readable.
#[derive(Debug, Clone)]
pub struct HttpSource {
    agent: ureq::Agent,
    page_origin: Option<String>,
    max_bytes: u64,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(None, DEFAULT_REMOTE_TIMEOUT, DEFAULT_MAX_REMOTE_BYTES)
    }
}

impl HttpSource {
    pub fn new(page_origin: Option<String>, timeout: Duration, max_bytes: u64) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            page_origin: page_origin.map(|o| o.trim_end_matches('/').to_string()),
            max_bytes,
        }
    }
}

impl ImageSource for HttpSource {
    fn fetch(&self, location: &str) -> Result<FetchedImage, SourceError> {
        let fetch_error = |reason: String| SourceError::Fetch {
            url: location.to_string(),
            reason,
        };
        if !is_remote(location) {
            return Err(fetch_error("not an http(s) URL".into()));
        }

        debug!(url = location, "fetching source image");
        let mut request = self.agent.get(location);
        if let Some(origin) = &self.page_origin {
            request = request.set("Origin", origin);
        }
        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                return Err(fetch_error(format!("HTTP {code}")));
            }
            Err(e) => return Err(fetch_error(e.to_string())),
        };

        let readable = cors_readable(
            self.page_origin.as_deref(),
            location,
            response.header("Access-Control-Allow-Origin"),
        );
        if !readable {
            warn!(url = location, "remote image is not readable from this origin");
        }

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(SourceError::TooLarge {
                url: location.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(FetchedImage {
            bytes,
            origin: SourceOrigin::Remote {
                url: location.to_string(),
                readable,
            },
        })
    }
}

/// `scheme://host[:port]` of a URL, lowercased.
fn url_origin(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    if host.is_empty() {
        return None;
    }
    Some(format!("{}://{}", scheme, host).to_ascii_lowercase())
}

/// Whether a response for `url` may be read back by `page_origin`.
fn cors_readable(page_origin: Option<&str>, url: &str, allow_origin: Option<&str>) -> bool {
    let Some(page) = page_origin else {
        return true;
    };
    let page = page.to_ascii_lowercase();
    if url_origin(url).as_deref() == Some(page.as_str()) {
        return true;
    }
    match allow_origin.map(str::trim) {
        Some("*") => true,
        Some(allowed) => allowed.trim_end_matches('/').eq_ignore_ascii_case(&page),
        None => false,
    }
}

/// Routes URLs to [`HttpSource`] and everything else to [`FileSource`].
#[derive(Debug, Clone, Default)]
pub struct LocationSource {
    pub http: HttpSource,
}

impl ImageSource for LocationSource {
    fn fetch(&self, location: &str) -> Result<FetchedImage, SourceError> {
        if is_remote(location) {
            self.http.fetch(location)
        } else {
            FileSource.fetch(location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{png_bytes, solid_image};

    #[test]
    fn decode_png_bytes() {
        let bytes = png_bytes(&solid_image(30, 20, [255, 0, 0, 255]));
        let img = SourceImage::decode(FetchedImage {
            bytes,
            origin: SourceOrigin::Memory,
        })
        .unwrap();
        assert_eq!(img.dimensions(), (30, 20));
        assert_eq!(img.pixels().get_pixel(5, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let result = SourceImage::decode(FetchedImage {
            bytes: b"definitely not an image".to_vec(),
            origin: SourceOrigin::Memory,
        });
        assert!(matches!(result, Err(SourceError::Decode(_))));
    }

    #[test]
    fn same_bytes_same_id() {
        let bytes = png_bytes(&solid_image(4, 4, [1, 2, 3, 255]));
        let a = SourceId::from_bytes(&bytes);
        let b = SourceId::from_bytes(&bytes);
        let c = SourceId::from_bytes(&png_bytes(&solid_image(4, 4, [3, 2, 1, 255])));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn remote_origin_readability() {
        assert!(SourceOrigin::Memory.is_readable());
        assert!(
            SourceOrigin::Remote {
                url: "https://cdn.example/a.png".into(),
                readable: true
            }
            .is_readable()
        );
        assert!(
            !SourceOrigin::Remote {
                url: "https://cdn.example/a.png".into(),
                readable: false
            }
            .is_readable()
        );
    }

    #[test]
    fn file_source_reads_local_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        std::fs::write(&path, png_bytes(&solid_image(8, 8, [0, 0, 255, 255]))).unwrap();

        let fetched = FileSource.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(fetched.origin, SourceOrigin::Local(path.clone()));
        let img = SourceImage::decode(fetched).unwrap();
        assert_eq!(img.dimensions(), (8, 8));
    }

    #[test]
    fn file_source_refuses_urls() {
        let result = FileSource.fetch("https://example.com/logo.png");
        assert!(matches!(result, Err(SourceError::RemoteUnavailable(_))));
    }

    #[test]
    fn readability_is_part_of_the_id() {
        let bytes = png_bytes(&solid_image(4, 4, [1, 2, 3, 255]));
        let local = SourceId::for_origin(&bytes, &SourceOrigin::Memory);
        let tainted = SourceId::for_origin(
            &bytes,
            &SourceOrigin::Remote {
                url: "https://other.example/a.png".into(),
                readable: false,
            },
        );
        assert_eq!(local, SourceId::from_bytes(&bytes));
        assert_ne!(local, tainted);
        assert_eq!(local.as_str(), tainted.as_str());
        assert!(tainted.to_string().ends_with("(cross-origin)"));
    }

    #[test]
    fn url_origin_strips_path_and_credentials() {
        assert_eq!(
            url_origin("https://CDN.example:8443/a/b.png?x=1").as_deref(),
            Some("https://cdn.example:8443")
        );
        assert_eq!(
            url_origin("http://user@host.example/").as_deref(),
            Some("http://host.example")
        );
        assert_eq!(url_origin("not a url"), None);
    }

    #[test]
    fn cors_rules() {
        let page = Some("https://app.example");
        let url = "https://cdn.example/a.png";
        assert!(cors_readable(None, url, None));
        assert!(cors_readable(page, "https://app.example/img.png", None));
        assert!(cors_readable(page, url, Some("*")));
        assert!(cors_readable(page, url, Some("https://app.example")));
        assert!(!cors_readable(page, url, Some("https://evil.example")));
        assert!(!cors_readable(page, url, None));
    }

    /// Serve one canned HTTP response on a loopback port.
    fn serve_once(status: &str, headers: &[(&str, &str)], body: Vec<u8>) -> String {
        use std::io::Write;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
            body.len()
        );
        for (name, value) in headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str("\r\n");
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{addr}/icon.png")
    }

    #[test]
    fn http_source_fetches_and_records_readability() {
        let png = png_bytes(&solid_image(6, 6, [0, 255, 0, 255]));
        let url = serve_once("200 OK", &[("Content-Type", "image/png")], png.clone());
        let source = HttpSource::new(
            Some("https://app.example".into()),
            Duration::from_secs(5),
            DEFAULT_MAX_REMOTE_BYTES,
        );
        let fetched = source.fetch(&url).unwrap();
        assert_eq!(fetched.bytes, png);
        assert_eq!(
            fetched.origin,
            SourceOrigin::Remote {
                url: url.clone(),
                readable: false
            }
        );

        let url = serve_once(
            "200 OK",
            &[("Access-Control-Allow-Origin", "*")],
            png.clone(),
        );
        let fetched = source.fetch(&url).unwrap();
        assert!(fetched.origin.is_readable());
        assert_eq!(SourceImage::decode(fetched).unwrap().dimensions(), (6, 6));
    }

    #[test]
    fn http_source_reports_status_and_size_limit() {
        let url = serve_once("404 Not Found", &[], b"missing".to_vec());
        let err = HttpSource::default().fetch(&url).unwrap_err();
        assert!(matches!(&err, SourceError::Fetch { reason, .. } if reason == "HTTP 404"));

        let url = serve_once("200 OK", &[], vec![0u8; 64]);
        let small = HttpSource::new(None, Duration::from_secs(5), 16);
        assert!(matches!(
            small.fetch(&url),
            Err(SourceError::TooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn location_source_routes_by_scheme() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("icon.png");
        std::fs::write(&path, png_bytes(&solid_image(3, 3, [1, 1, 1, 255]))).unwrap();
        let router = LocationSource::default();
        let local = router.fetch(path.to_str().unwrap()).unwrap();
        assert_eq!(local.origin, SourceOrigin::Local(path));

        let png = png_bytes(&solid_image(2, 2, [9, 9, 9, 255]));
        let url = serve_once("200 OK", &[], png);
        let remote = router.fetch(&url).unwrap();
        assert!(matches!(remote.origin, SourceOrigin::Remote { readable: true, .. }));
    }

    #[test]
    fn file_source_missing_file_is_io_error() {
        let result = FileSource.fetch("/nonexistent/logo.png");
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
