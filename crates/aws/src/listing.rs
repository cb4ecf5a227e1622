//! Parser for the S3 `ListObjectsV2` XML response.

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use static_deploy_model::{Inventory, RemoteRecord};

use crate::error::AwsError;

/// A parsed bucket listing.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub inventory: Inventory,
    /// Set when the store returned only part of the bucket.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Key,
    ETag,
    LastModified,
    IsTruncated,
}

#[derive(Debug, Default)]
struct PartialRecord {
    key: Option<String>,
    etag: Option<String>,
    last_modified: Option<String>,
}

impl PartialRecord {
    fn slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Key => Some(&mut self.key),
            Field::ETag => Some(&mut self.etag),
            Field::LastModified => Some(&mut self.last_modified),
            Field::IsTruncated => None,
        }
    }

    fn finish(self) -> Result<RemoteRecord, AwsError> {
        let (Some(key), Some(etag), Some(last_modified)) = (self.key, self.etag, self.last_modified)
        else {
            return Err(malformed("Contents is missing ETag, Key or LastModified"));
        };

        let parsed = DateTime::parse_from_rfc3339(last_modified.trim())
            .map_err(|e| malformed(format!("invalid LastModified {last_modified:?}: {e}")))?;

        Ok(RemoteRecord {
            key,
            content_hash: etag.trim_matches('"').to_string(),
            last_modified: parsed.with_timezone(&Utc),
        })
    }
}

fn malformed(msg: impl Into<String>) -> AwsError {
    AwsError::MalformedListing(msg.into())
}

/// Parses a `ListBucketResult` document into an [`Inventory`].
///
/// Any structural problem fails the whole listing; a partial inventory
/// is never returned. A listing without `Contents` is a valid, empty
/// bucket.
pub fn parse_listing(xml: &str) -> Result<Listing, AwsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut listing = Listing::default();
    let mut saw_root = false;
    let mut depth = 0usize;
    let mut current: Option<PartialRecord> = None;
    let mut field: Option<Field> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("invalid XML: {e}")))?;

        match event {
            Event::Start(e) => {
                depth += 1;
                match (depth, e.local_name().as_ref()) {
                    (1, b"ListBucketResult") => saw_root = true,
                    (1, other) => {
                        return Err(malformed(format!(
                            "missing ListBucketResult, found {}",
                            String::from_utf8_lossy(other)
                        )));
                    }
                    (2, b"Contents") => current = Some(PartialRecord::default()),
                    (2, b"IsTruncated") => field = Some(Field::IsTruncated),
                    (3, name) => {
                        field = record_field(name);
                        mark_present(current.as_mut(), field);
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match (depth + 1, e.local_name().as_ref()) {
                (1, b"ListBucketResult") => saw_root = true,
                (1, other) => {
                    return Err(malformed(format!(
                        "missing ListBucketResult, found {}",
                        String::from_utf8_lossy(other)
                    )));
                }
                (2, b"Contents") => {
                    return Err(malformed("Contents is missing ETag, Key or LastModified"));
                }
                (3, name) => mark_present(current.as_mut(), record_field(name)),
                _ => {}
            },
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| malformed(format!("invalid text: {e}")))?;
                append_text(&mut listing, current.as_mut(), field, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                append_text(&mut listing, current.as_mut(), field, &text);
            }
            Event::End(e) => {
                if depth == 2
                    && e.local_name().as_ref() == b"Contents"
                    && let Some(record) = current.take()
                {
                    listing.inventory.insert(record.finish()?);
                }
                field = None;
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(malformed("missing ListBucketResult"));
    }

    Ok(listing)
}

fn record_field(name: &[u8]) -> Option<Field> {
    match name {
        b"Key" => Some(Field::Key),
        b"ETag" => Some(Field::ETag),
        b"LastModified" => Some(Field::LastModified),
        _ => None,
    }
}

/// An element that is present but empty still counts as present.
fn mark_present(current: Option<&mut PartialRecord>, field: Option<Field>) {
    if let (Some(record), Some(f)) = (current, field)
        && let Some(slot) = record.slot(f)
    {
        *slot = Some(String::new());
    }
}

fn append_text(
    listing: &mut Listing,
    current: Option<&mut PartialRecord>,
    field: Option<Field>,
    text: &str,
) {
    match (field, current) {
        (Some(Field::IsTruncated), _) => listing.truncated = text.trim() == "true",
        (Some(f), Some(record)) => {
            if let Some(slot) = record.slot(f) {
                slot.get_or_insert_with(String::new).push_str(text);
            }
        }
        _ => {}
    }
}
