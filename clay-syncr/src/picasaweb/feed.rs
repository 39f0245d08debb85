//! GData album, photo and tag feeds

use chrono::{DateTime, NaiveDateTime};
use roxmltree::{Document, Node};

use clay_common::dates::parse_gdata_time;

use crate::xml::{children, find, find_text, link_href, ATOM_NS, EXIF_NS, GEORSS_NS, GML_NS, GPHOTO_NS, MRSS_NS};
use crate::{Result, SyncError};

/// One album of a user's album feed
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumEntry {
    pub gphoto_id: String,
    pub name: String,
    pub user: String,
    pub nickname: String,
    pub title: String,
    pub summary: String,
    pub location: String,
    pub updated: NaiveDateTime,
    pub access: String,
    pub numphotos: i64,
}

/// EXIF block of a photo entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifTags {
    pub make: String,
    pub model: String,
    pub exposure: String,
    pub iso: String,
    pub flash: String,
    pub focal_length: String,
}

/// One photo of an album's photo feed
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoEntry {
    pub gphoto_id: String,
    pub album_id: String,
    pub updated: NaiveDateTime,
    pub title: String,
    pub summary: String,
    /// Taken time (`gphoto:timestamp`, falling back to `updated`)
    pub timestamp: NaiveDateTime,
    pub alternate_url: String,
    /// `media:thumbnail` URLs in feed order (small, medium, thumbnail)
    pub thumbnails: Vec<String>,
    pub content_url: String,
    pub keywords: String,
    pub position: Option<(f64, f64)>,
    pub exif: ExifTags,
}

fn required(node: Node, path: &[(&str, &str)], what: &str) -> Result<String> {
    find_text(node, path).ok_or_else(|| SyncError::Parse(format!("Feed entry without {}", what)))
}

fn optional(node: Node, path: &[(&str, &str)]) -> String {
    find_text(node, path).unwrap_or_default()
}

fn updated_of(entry: Node) -> Result<NaiveDateTime> {
    let updated = required(entry, &[(ATOM_NS, "updated")], "updated")?;
    Ok(parse_gdata_time(&updated)?)
}

fn entries<'a, 'i>(doc: &'a Document<'i>) -> Vec<Node<'a, 'i>> {
    children(doc.root_element(), (ATOM_NS, "entry"))
}

/// Parse `/data/feed/api/user/<user>?kind=album`
pub fn parse_album_feed(body: &str) -> Result<Vec<AlbumEntry>> {
    let doc = Document::parse(body)?;
    entries(&doc)
        .into_iter()
        .map(|entry| {
            Ok(AlbumEntry {
                gphoto_id: required(entry, &[(GPHOTO_NS, "id")], "gphoto:id")?,
                name: required(entry, &[(GPHOTO_NS, "name")], "gphoto:name")?,
                user: optional(entry, &[(GPHOTO_NS, "user")]),
                nickname: optional(entry, &[(GPHOTO_NS, "nickname")]),
                title: optional(entry, &[(ATOM_NS, "title")]),
                summary: optional(entry, &[(ATOM_NS, "summary")]),
                location: optional(entry, &[(GPHOTO_NS, "location")]),
                updated: updated_of(entry)?,
                access: optional(entry, &[(GPHOTO_NS, "access")]),
                numphotos: optional(entry, &[(GPHOTO_NS, "numphotos")])
                    .trim()
                    .parse()
                    .unwrap_or(0),
            })
        })
        .collect()
}

fn position_of(entry: Node) -> Option<(f64, f64)> {
    let pos = find_text(entry, &[(GEORSS_NS, "where"), (GML_NS, "Point"), (GML_NS, "pos")])?;
    let mut parts = pos.split_whitespace().map(|p| p.parse::<f64>());
    match (parts.next(), parts.next()) {
        (Some(Ok(lat)), Some(Ok(lon))) => Some((lat, lon)),
        _ => None,
    }
}

fn timestamp_of(entry: Node, updated: NaiveDateTime) -> NaiveDateTime {
    find_text(entry, &[(GPHOTO_NS, "timestamp")])
        .and_then(|ms| ms.trim().parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.naive_utc())
        .unwrap_or(updated)
}

/// Parse `/data/feed/api/user/<user>/album/<name>?kind=photo`
pub fn parse_photo_feed(body: &str) -> Result<Vec<PhotoEntry>> {
    let doc = Document::parse(body)?;
    entries(&doc)
        .into_iter()
        .map(|entry| {
            let updated = updated_of(entry)?;
            let group = find(entry, &[(MRSS_NS, "group")]);
            let thumbnails = group
                .map(|g| {
                    children(g, (MRSS_NS, "thumbnail"))
                        .into_iter()
                        .filter_map(|t| t.attribute("url").map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            let content_url = group
                .and_then(|g| find(g, &[(MRSS_NS, "content")]))
                .and_then(|c| c.attribute("url"))
                .unwrap_or_default()
                .to_string();
            let exif_text = |name: &str| optional(entry, &[(EXIF_NS, "tags"), (EXIF_NS, name)]);

            Ok(PhotoEntry {
                gphoto_id: required(entry, &[(GPHOTO_NS, "id")], "gphoto:id")?,
                album_id: optional(entry, &[(GPHOTO_NS, "albumid")]),
                updated,
                title: optional(entry, &[(ATOM_NS, "title")]),
                summary: optional(entry, &[(ATOM_NS, "summary")]),
                timestamp: timestamp_of(entry, updated),
                alternate_url: link_href(entry, "alternate").unwrap_or_default(),
                thumbnails,
                content_url,
                keywords: optional(entry, &[(MRSS_NS, "group"), (MRSS_NS, "keywords")]),
                position: position_of(entry),
                exif: ExifTags {
                    make: exif_text("make"),
                    model: exif_text("model"),
                    exposure: exif_text("exposure"),
                    iso: exif_text("iso"),
                    flash: exif_text("flash"),
                    focal_length: exif_text("focallength"),
                },
            })
        })
        .collect()
}

/// Entry titles of a `kind=tag` feed
pub fn parse_tag_feed(body: &str) -> Result<Vec<String>> {
    let doc = Document::parse(body)?;
    Ok(entries(&doc)
        .into_iter()
        .map(|entry| optional(entry, &[(ATOM_NS, "title")]))
        .collect())
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const ALBUM_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:gphoto="http://schemas.google.com/photos/2007">
  <id>http://picasaweb.google.com/data/feed/api/user/samuelclay</id>
  <entry>
    <id>http://picasaweb.google.com/data/entry/api/user/samuelclay/albumid/5001</id>
    <updated>2008-06-01T12:00:00.000Z</updated>
    <title type="text">Summer Trip</title>
    <summary type="text">Out west</summary>
    <gphoto:id>5001</gphoto:id>
    <gphoto:name>SummerTrip</gphoto:name>
    <gphoto:location>Utah</gphoto:location>
    <gphoto:access>public</gphoto:access>
    <gphoto:numphotos>2</gphoto:numphotos>
    <gphoto:user>samuelclay</gphoto:user>
    <gphoto:nickname>Samuel</gphoto:nickname>
  </entry>
  <entry>
    <id>http://picasaweb.google.com/data/entry/api/user/samuelclay/albumid/5002</id>
    <updated>2008-07-01T12:00:00.000Z</updated>
    <title type="text">Empty</title>
    <summary type="text"></summary>
    <gphoto:id>5002</gphoto:id>
    <gphoto:name>Empty</gphoto:name>
    <gphoto:access>public</gphoto:access>
    <gphoto:numphotos>0</gphoto:numphotos>
    <gphoto:user>samuelclay</gphoto:user>
    <gphoto:nickname>Samuel</gphoto:nickname>
  </entry>
</feed>"#;

    pub fn photo_entry(id: &str, updated: &str, title: &str) -> String {
        format!(
            r#"<entry>
    <id>http://picasaweb.google.com/data/entry/api/user/samuelclay/albumid/5001/photoid/{id}</id>
    <updated>{updated}</updated>
    <title type="text">{title}</title>
    <summary type="text">caption</summary>
    <link rel="alternate" type="text/html" href="http://picasaweb.google.com/samuelclay/SummerTrip/photo#{id}"/>
    <gphoto:id>{id}</gphoto:id>
    <gphoto:albumid>5001</gphoto:albumid>
    <gphoto:timestamp>1212321600000</gphoto:timestamp>
    <exif:tags>
      <exif:make>Canon</exif:make>
      <exif:model>Canon EOS 20D</exif:model>
      <exif:iso>200</exif:iso>
      <exif:focallength>35.0</exif:focallength>
    </exif:tags>
    <georss:where><gml:Point><gml:pos>40.7 -73.99</gml:pos></gml:Point></georss:where>
    <media:group>
      <media:content url="http://lh3.ggpht.com/{id}/full.jpg" type="image/jpeg"/>
      <media:keywords>utah, desert</media:keywords>
      <media:thumbnail url="http://lh3.ggpht.com/{id}/s72-c.jpg" height="72" width="72"/>
      <media:thumbnail url="http://lh3.ggpht.com/{id}/s160-c.jpg" height="160" width="160"/>
      <media:thumbnail url="http://lh3.ggpht.com/{id}/s288.jpg" height="216" width="288"/>
    </media:group>
  </entry>"#
        )
    }

    pub fn photo_feed(entries: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:gphoto="http://schemas.google.com/photos/2007"
      xmlns:exif="http://schemas.google.com/photos/exif/2007"
      xmlns:georss="http://www.georss.org/georss"
      xmlns:gml="http://www.opengis.net/gml"
      xmlns:media="http://search.yahoo.com/mrss/">
  {}
</feed>"#,
            entries.join("\n")
        )
    }
}
