//! Request-target URIs.

use std::fmt;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("malformed uri")]
    Malformed,
    #[error("userinfo or port present without a host")]
    MissingHost,
}

/// Decomposed request target.
///
/// Both the absolute form (`http://user@host:8080/a/b?q#f`) and the origin
/// form (`/a/b?q#f`) are accepted; fields absent from the given form stay
/// empty. Rendering with `Display` reassembles the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    scheme: String,
    userinfo: String,
    host: String,
    port: Option<u16>,
    segments: Vec<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    pub fn parse(input: &str) -> Result<Uri, UriError> {
        if input.starts_with('/') {
            Self::parse_origin(input)
        } else {
            Self::parse_absolute(input)
        }
    }

    fn parse_origin(input: &str) -> Result<Uri, UriError> {
        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (input, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };
        Ok(Uri {
            segments: split_segments(path),
            query,
            fragment,
            ..Uri::default()
        })
    }

    fn parse_absolute(input: &str) -> Result<Uri, UriError> {
        // Userinfo or a port in the authority demand a non-empty host.
        if let Some((_, after_scheme)) = input.split_once("://") {
            let end = after_scheme
                .find(|c: char| c == '/' || c == '?' || c == '#')
                .unwrap_or(after_scheme.len());
            let authority = &after_scheme[..end];
            let host_part = authority
                .rsplit_once('@')
                .map_or(authority, |(_, host)| host);
            let host_only = host_part
                .split_once(':')
                .map_or(host_part, |(host, _)| host);
            if host_only.is_empty() && !authority.is_empty() {
                return Err(UriError::MissingHost);
            }
        }

        let url = Url::parse(input).map_err(|_| UriError::Malformed)?;
        let mut userinfo = url.username().to_string();
        if let Some(password) = url.password() {
            userinfo.push(':');
            userinfo.push_str(password);
        }
        Ok(Uri {
            scheme: url.scheme().to_string(),
            userinfo,
            host: url.host_str().unwrap_or_default().to_string(),
            port: url.port(),
            segments: url
                .path_segments()
                .map(|segments| {
                    segments
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn userinfo(&self) -> &str {
        &self.userinfo
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path, reassembled from its segments. Always starts with `/`.
    pub fn path(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}://", self.scheme)?;
            if !self.userinfo.is_empty() {
                write!(f, "{}@", self.userinfo)?;
            }
            f.write_str(&self.host)?;
            if let Some(port) = self.port {
                write!(f, ":{}", port)?;
            }
        }
        f.write_str(&self.path())?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}
