use std::fmt;
use std::path::Path;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    /// Fetched over the network; may hang or fail.
    Remote,
    /// Bundled with the shell; expected to always be readable.
    Local,
}

/// One addressable source of the content bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    locator: String,
    kind: OriginKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("empty locator")]
    Empty,
    #[error("missing host in {locator}")]
    MissingHost { locator: String },
    #[error("unsupported scheme {scheme}")]
    UnsupportedScheme { scheme: String },
    #[error("malformed locator: {0}")]
    Malformed(#[from] url::ParseError),
}

impl Origin {
    /// Classifies a locator: `http`/`https` URLs are remote, `file` URLs and
    /// plain filesystem paths are local. Anything else is rejected.
    pub fn parse(raw: &str) -> Result<Self, OriginError> {
        let locator = raw.trim();
        if locator.is_empty() {
            return Err(OriginError::Empty);
        }

        match Url::parse(locator) {
            Ok(url) => match url.scheme() {
                "http" | "https" => {
                    if url.host_str().is_none() {
                        return Err(OriginError::MissingHost {
                            locator: locator.to_string(),
                        });
                    }
                    Ok(Self::new(locator, OriginKind::Remote))
                }
                "file" => Ok(Self::new(locator, OriginKind::Local)),
                // Windows drive letters parse as a one-letter scheme.
                scheme if scheme.len() == 1 && Path::new(locator).is_absolute() => {
                    Ok(Self::new(locator, OriginKind::Local))
                }
                scheme => Err(OriginError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                }),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Self::new(locator, OriginKind::Local))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn new(locator: &str, kind: OriginKind) -> Self {
        Self {
            locator: locator.to_string(),
            kind,
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn kind(&self) -> OriginKind {
        self.kind
    }

    pub fn is_local(&self) -> bool {
        self.kind == OriginKind::Local
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginListError {
    #[error("origin list is empty")]
    Empty,
    #[error("origin #{index} is invalid: {source}")]
    InvalidOrigin {
        index: usize,
        #[source]
        source: OriginError,
    },
    #[error("last origin must be a local resource, got {locator}")]
    LastNotLocal { locator: String },
}

/// Ordered, immutable origins. Priority is the position in the list.
///
/// Always non-empty, and the last entry is always local so that the chain ends
/// on a resource that cannot be network-unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginList {
    origins: Vec<Origin>,
}

impl OriginList {
    pub fn new<I, S>(locators: I) -> Result<Self, OriginListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = locators
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                Origin::parse(raw.as_ref())
                    .map_err(|source| OriginListError::InvalidOrigin { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match origins.last() {
            None => Err(OriginListError::Empty),
            Some(last) if !last.is_local() => Err(OriginListError::LastNotLocal {
                locator: last.locator.clone(),
            }),
            Some(_) => Ok(Self { origins }),
        }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Never true for a list built by [`OriginList::new`].
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Origin> {
        self.origins.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Origin> {
        self.origins.iter()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.origins.len()
    }
}
