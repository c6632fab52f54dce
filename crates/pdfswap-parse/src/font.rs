//! Font resolution through resource scope chains.
//!
//! A page's fonts are looked up by resource name, first in the page's own
//! `/Resources` and then in each inherited scope. A resolved [`Font`] knows
//! how to decode shown strings to Unicode and how to encode edited text back.
//! ToUnicode CMaps are parsed at most once per stream through a shared
//! [`CMapCache`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::cmap::{CMap, PLACEHOLDER};
use crate::encoding::{Encoded, SimpleEncoding};
use crate::error::BackendError;

/// Identity of an embedded stream (object number and generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey(pub u32, pub u16);

impl From<(u32, u16)> for StreamKey {
    fn from((number, generation): (u32, u16)) -> Self {
        StreamKey(number, generation)
    }
}

/// A ToUnicode stream, decompressed, with its identity.
#[derive(Debug, Clone)]
pub struct CMapSource {
    /// Stream identity used as the cache key.
    pub key: StreamKey,
    /// Decompressed stream bytes.
    pub data: Arc<[u8]>,
}

/// The font dictionary entries that matter for decoding text.
#[derive(Debug, Clone, Default)]
pub struct FontDescriptor {
    /// `/BaseFont`, if present.
    pub base_font: Option<String>,
    /// Encoding name: `/Encoding` itself, or `/BaseEncoding` of an
    /// encoding dictionary.
    pub encoding: Option<String>,
    /// `/ToUnicode` stream, if present.
    pub to_unicode: Option<CMapSource>,
}

/// A font, as used to decode and encode shown strings.
#[derive(Debug, Clone)]
pub enum Font {
    /// Single-byte font with an encoding from the supported set.
    Simple {
        /// Resource name the font was selected with.
        name: String,
        /// The font's encoding.
        encoding: SimpleEncoding,
    },
    /// Font with a ToUnicode CMap.
    Table {
        /// Resource name the font was selected with.
        name: String,
        /// The parsed CMap.
        cmap: Arc<CMap>,
    },
    /// Font whose encoding is outside the supported set.
    Unsupported {
        /// Resource name the font was selected with.
        name: String,
        /// Encoding name as found in the font dictionary, if any.
        encoding: Option<String>,
    },
}

impl Font {
    /// Resource name the font was selected with.
    pub fn name(&self) -> &str {
        match self {
            Font::Simple { name, .. } | Font::Table { name, .. } | Font::Unsupported { name, .. } => {
                name
            }
        }
    }

    /// Decode shown bytes to Unicode. Never fails.
    ///
    /// Unsupported fonts decode to one placeholder per byte.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Font::Simple { encoding, .. } => encoding.decode(bytes),
            Font::Table { cmap, .. } => cmap.decode(bytes),
            Font::Unsupported { .. } => bytes.iter().map(|_| PLACEHOLDER).collect(),
        }
    }

    /// Encode Unicode text to shown bytes.
    ///
    /// Characters without a code are dropped and reported in the result.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Encode`] for fonts with an unsupported encoding.
    pub fn encode(&self, text: &str) -> Result<Encoded, BackendError> {
        match self {
            Font::Simple { encoding, .. } => Ok(encoding.encode(text)),
            Font::Table { cmap, .. } => Ok(cmap.encode(text)),
            Font::Unsupported { name, encoding } => Err(BackendError::Encode(format!(
                "font /{name} has unsupported encoding {}",
                encoding.as_deref().unwrap_or("(none)")
            ))),
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Font::Simple { name, encoding } => write!(f, "/{name} ({})", encoding.name()),
            Font::Table { name, .. } => write!(f, "/{name} (ToUnicode)"),
            Font::Unsupported { name, .. } => write!(f, "/{name} (unsupported)"),
        }
    }
}

/// Decode bytes shown with no active font: Latin-1.
pub fn decode_without_font(bytes: &[u8]) -> String {
    SimpleEncoding::Latin1.decode(bytes)
}

/// Encode text for a string shown with no active font: Latin-1.
pub fn encode_without_font(text: &str) -> Encoded {
    SimpleEncoding::Latin1.encode(text)
}

/// One level of resource dictionaries, with the scope it inherits from.
#[derive(Debug, Clone, Default)]
pub struct ResourceScope {
    fonts: HashMap<String, FontDescriptor>,
    parent: Option<Box<ResourceScope>>,
}

impl ResourceScope {
    /// A scope with the given fonts and no parent.
    pub fn new(fonts: HashMap<String, FontDescriptor>) -> Self {
        Self {
            fonts,
            parent: None,
        }
    }

    /// Build a chain from innermost (page) to outermost scope.
    pub fn chain<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = HashMap<String, FontDescriptor>>,
        I::IntoIter: DoubleEndedIterator,
    {
        levels
            .into_iter()
            .rev()
            .fold(None, |parent: Option<ResourceScope>, fonts| {
                Some(ResourceScope {
                    fonts,
                    parent: parent.map(Box::new),
                })
            })
            .unwrap_or_default()
    }

    /// Find a font by resource name, walking outward through parent scopes.
    pub fn lookup(&self, name: &str) -> Option<&FontDescriptor> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(found) = current.fonts.get(name) {
                return Some(found);
            }
            scope = current.parent.as_deref();
        }
        None
    }

    /// Number of scopes in the chain, including this one.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |parent| parent.depth())
    }
}

type CacheSlot = Arc<OnceLock<Result<Arc<CMap>, String>>>;

/// Write-once cache of parsed CMaps keyed by stream identity.
///
/// Safe to share between threads processing different pages. Each distinct
/// stream is parsed at most once, even when first requested concurrently.
#[derive(Default)]
pub struct CMapCache {
    slots: Mutex<HashMap<StreamKey, CacheSlot>>,
    builds: AtomicUsize,
}

impl CMapCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the CMap for `source`, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CMap`] if the stream is not a valid CMap. The
    /// failure is cached too.
    pub fn get_or_build(&self, source: &CMapSource) -> Result<Arc<CMap>, BackendError> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| BackendError::CMap("CMap cache lock poisoned".to_string()))?;
            Arc::clone(slots.entry(source.key).or_default())
        };
        let built = slot.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "tracing")]
            tracing::debug!(stream = ?source.key, bytes = source.data.len(), "parsing ToUnicode CMap");
            CMap::parse(&source.data)
                .map(Arc::new)
                .map_err(|e| e.to_string())
        });
        built
            .clone()
            .map_err(|msg| BackendError::CMap(format!("stream {} {}: {msg}", source.key.0, source.key.1)))
    }

    /// Number of CMaps parsed so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of distinct streams requested so far.
    pub fn len(&self) -> usize {
        self.slots.lock().map_or(0, |slots| slots.len())
    }

    /// Returns true if nothing has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CMapCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CMapCache")
            .field("streams", &self.len())
            .field("builds", &self.builds())
            .finish()
    }
}

/// Resolves font names on one page to [`Font`]s.
///
/// Resolved fonts are memoized for the page so every text unit shown with the
/// same font shares one `Arc<Font>`.
#[derive(Debug)]
pub struct FontResolver<'a> {
    scope: &'a ResourceScope,
    cache: &'a CMapCache,
    resolved: HashMap<String, Option<Arc<Font>>>,
}

impl<'a> FontResolver<'a> {
    /// Create a resolver over `scope`, sharing `cache`.
    pub fn new(scope: &'a ResourceScope, cache: &'a CMapCache) -> Self {
        Self {
            scope,
            cache,
            resolved: HashMap::new(),
        }
    }

    /// Resolve a font resource name.
    ///
    /// Returns `Ok(None)` when no scope in the chain defines `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CMap`] if the font's ToUnicode CMap is malformed.
    pub fn resolve(&mut self, name: &str) -> Result<Option<Arc<Font>>, BackendError> {
        if let Some(known) = self.resolved.get(name) {
            return Ok(known.clone());
        }
        let font = match self.scope.lookup(name) {
            Some(descriptor) => Some(Arc::new(self.build(name, descriptor)?)),
            None => None,
        };
        #[cfg(feature = "tracing")]
        match &font {
            Some(font) => tracing::debug!(%font, "resolved font"),
            None => tracing::warn!(name, "font not found in resource scopes"),
        }
        self.resolved.insert(name.to_string(), font.clone());
        Ok(font)
    }

    fn build(&self, name: &str, descriptor: &FontDescriptor) -> Result<Font, BackendError> {
        if let Some(source) = &descriptor.to_unicode {
            return Ok(Font::Table {
                name: name.to_string(),
                cmap: self.cache.get_or_build(source)?,
            });
        }
        let simple = descriptor
            .encoding
            .as_deref()
            .and_then(SimpleEncoding::from_pdf_name);
        Ok(match simple {
            Some(encoding) => Font::Simple {
                name: name.to_string(),
                encoding,
            },
            None => Font::Unsupported {
                name: name.to_string(),
                encoding: descriptor.encoding.clone(),
            },
        })
    }
}
