use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use reqwest::Url;

/// Where a deployment manifest is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateLocation {
    /// A `file:` URI, UNC share or absolute filesystem path.
    Local(PathBuf),
    /// An `http:` or `https:` address.
    Web(Url),
    /// An absolute URI with a scheme that no transport handles.
    Unknown(String),
}

impl UpdateLocation {
    /// Classify a configured update location.
    ///
    /// Returns `None` for empty values and for anything that is neither an
    /// absolute URI nor an absolute path.
    #[must_use]
    pub fn classify(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if is_unc_path(raw) || is_drive_path(raw) || raw.starts_with('/') {
            return Some(Self::Local(PathBuf::from(raw)));
        }

        let url = Url::parse(raw).ok()?;
        match url.scheme() {
            "http" | "https" => Some(Self::Web(url)),
            "file" => Some(Self::Local(file_url_to_path(&url))),
            _ => Some(Self::Unknown(raw.to_string())),
        }
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    #[must_use]
    pub fn is_web(&self) -> bool {
        matches!(self, Self::Web(_))
    }
}

impl fmt::Display for UpdateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Web(url) => write!(f, "{url}"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

fn is_unc_path(raw: &str) -> bool {
    raw.len() > 2 && raw.starts_with(r"\\")
}

fn is_drive_path(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && matches!(bytes[2], b'\\' | b'/')
}

fn file_url_to_path(url: &Url) -> PathBuf {
    if let Ok(path) = url.to_file_path() {
        return path;
    }

    // `file://server/share/...` names a UNC share, which only Windows can
    // express as a native path.
    let segments = decoded_segments(url);
    match url.host_str() {
        Some(host) if !host.is_empty() => {
            PathBuf::from(format!(r"\\{host}\{}", segments.join(r"\")))
        }
        _ => PathBuf::from(format!("/{}", segments.join("/"))),
    }
}

fn decoded_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .map(|segment| {
                    urlencoding::decode(segment)
                        .map_or_else(|_| segment.to_string(), Cow::into_owned)
                })
                .collect()
        })
        .unwrap_or_default()
}
