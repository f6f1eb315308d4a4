use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// One decoded response of the public resources endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// The requested path names a single file.
    File(PublicFile),
    /// One page of a directory's children.
    Directory(ListingPage),
    /// Neither shape; the raw payload is kept for diagnostics.
    Malformed(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicFile {
    pub name: String,
    pub size: u64,
    pub md5: String,
    pub download_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    File(PublicFile),
    Directory { name: String },
    /// A file the API lists without a download link (e.g. blocked by the
    /// antivirus check).
    Unavailable { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<RemoteEntry>,
    pub limit: u32,
    /// Offset this page was requested at; the server's echo is not trusted.
    pub offset: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Dir,
}

impl Listing {
    /// Decodes a response to a listing request made at `requested_offset`.
    pub fn from_value(value: Value, requested_offset: u32) -> Self {
        match classify(&value, requested_offset) {
            Some(listing) => listing,
            None => Listing::Malformed(value),
        }
    }
}

impl ListingPage {
    /// Offset of the following page of the same directory, if any remain.
    ///
    /// A zero `limit` never advances, so it is treated as the last page.
    pub fn next_offset(&self) -> Option<u32> {
        if self.limit == 0 {
            return None;
        }
        let next = self.offset.saturating_add(self.limit);
        (next < self.total).then_some(next)
    }
}

#[derive(Debug, Deserialize)]
struct RawResource {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    resource_type: Option<ResourceType>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    file: Option<Url>,
    #[serde(rename = "_embedded", default)]
    embedded: Option<RawEmbedded>,
}

#[derive(Debug, Deserialize)]
struct RawEmbedded {
    items: Vec<RawResource>,
    limit: u32,
    total: u32,
}

fn classify(value: &Value, requested_offset: u32) -> Option<Listing> {
    let raw = RawResource::deserialize(value).ok()?;
    if raw.file.is_some() {
        return raw.into_file().map(Listing::File);
    }
    let embedded = raw.embedded?;
    let items = embedded
        .items
        .into_iter()
        .map(RawResource::into_entry)
        .collect::<Option<Vec<_>>>()?;
    Some(Listing::Directory(ListingPage {
        items,
        limit: embedded.limit,
        offset: requested_offset,
        total: embedded.total,
    }))
}

impl RawResource {
    fn into_file(self) -> Option<PublicFile> {
        Some(PublicFile {
            name: self.name?,
            size: self.size?,
            md5: self.md5?,
            download_url: self.file?,
        })
    }

    fn into_entry(self) -> Option<RemoteEntry> {
        if self.file.is_some() {
            return self.into_file().map(RemoteEntry::File);
        }
        let name = self.name?;
        match self.resource_type {
            Some(ResourceType::File) => Some(RemoteEntry::Unavailable { name }),
            Some(ResourceType::Dir) | None => Some(RemoteEntry::Directory { name }),
        }
    }
}
