//! Sidecar markers document (XML)
//!
//! ```xml
//! <markers>
//!   <Mark id="1">
//!     <Label>M1</Label>
//!     <Timestamp>1970-01-01T00:00:01.000Z</Timestamp>
//!     <Lat>41</Lat>
//!     <Lon>-8</Lon>
//!     <Image>mra/markers/M1.png</Image>
//!     <Draw>N/A</Draw>
//!     <Altitude>4.2</Altitude>
//!     <Depth>12.5</Depth>
//!     <Range>10</Range>
//!     <Height>0</Height>
//!     <Classification>UNDEFINED</Classification>
//!     <Annotation>&lt;Your annotation here.&gt;</Annotation>
//!   </Mark>
//! </markers>
//! ```
//!
//! The document is always rebuilt in full from the in-memory list; there is no
//! in-place patching of single entries.

use crate::error::{DecodeError, Error, Result};
use crate::model::{Classification, DrawPath, MarkerRecord};
use lrmm_common::{files, time};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::fs;
use std::path::Path;

pub const ROOT_TAG: &str = "markers";
pub const MARK_TAG: &str = "Mark";
pub const ID_ATTR: &str = "id";

const LABEL: &str = "Label";
const TIMESTAMP: &str = "Timestamp";
const LAT: &str = "Lat";
const LON: &str = "Lon";
const IMAGE: &str = "Image";
const DRAW: &str = "Draw";
const ALTITUDE: &str = "Altitude";
const DEPTH: &str = "Depth";
const RANGE: &str = "Range";
const HEIGHT: &str = "Height";
const CLASSIFICATION: &str = "Classification";
const ANNOTATION: &str = "Annotation";

/// Child elements of `<Mark>`, in document order; all are required
pub const FIELDS: [&str; 12] = [
    LABEL,
    TIMESTAMP,
    LAT,
    LON,
    IMAGE,
    DRAW,
    ALTITUDE,
    DEPTH,
    RANGE,
    HEIGHT,
    CLASSIFICATION,
    ANNOTATION,
];

/// Read and decode the document at `path`
pub fn load(path: &Path) -> std::result::Result<Vec<MarkerRecord>, DecodeError> {
    let text = fs::read_to_string(path)?;
    decode(&text)
}

/// Encode `records` and atomically replace the document at `path`
pub fn save(path: &Path, records: &[MarkerRecord]) -> Result<()> {
    let bytes = encode(records)?;
    files::write_atomic(path, &bytes).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Serialize `records` in list order
pub fn encode(records: &[MarkerRecord]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT_TAG)))
        .map_err(encode_err)?;

    for record in records {
        write_mark(&mut writer, record)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT_TAG)))
        .map_err(encode_err)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_mark(writer: &mut Writer<Vec<u8>>, record: &MarkerRecord) -> Result<()> {
    let timestamp = time::format_utc_millis(record.timestamp_millis).ok_or_else(|| {
        Error::Encode(format!(
            "timestamp {} of marker {} is out of range",
            record.timestamp_millis, record.label
        ))
    })?;
    let id = record.index.to_string();

    let fields: [(&str, String); 12] = [
        (LABEL, record.label.clone()),
        (TIMESTAMP, timestamp),
        (LAT, record.latitude_deg.to_string()),
        (LON, record.longitude_deg.to_string()),
        (IMAGE, record.image_path.clone().unwrap_or_default()),
        (DRAW, record.draw_path.as_str().to_string()),
        (ALTITUDE, record.altitude_m.to_string()),
        (DEPTH, record.depth_m.to_string()),
        (RANGE, record.range_m.to_string()),
        (HEIGHT, record.height_m.to_string()),
        (CLASSIFICATION, record.classification.name().to_string()),
        (ANNOTATION, record.annotation.clone()),
    ];

    let mut start = BytesStart::new(MARK_TAG);
    start.push_attribute((ID_ATTR, id.as_str()));
    writer.write_event(Event::Start(start)).map_err(encode_err)?;

    for (name, value) in &fields {
        writer
            .create_element(*name)
            .write_text_content(BytesText::new(value))
            .map_err(encode_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(MARK_TAG)))
        .map_err(encode_err)?;
    Ok(())
}

fn encode_err<E: Display>(e: E) -> Error {
    Error::Encode(e.to_string())
}

fn malformed<E: Display>(e: E) -> DecodeError {
    DecodeError::Malformed(e.to_string())
}

/// Decode a whole document; any problem fails the load
pub fn decode(text: &str) -> std::result::Result<Vec<MarkerRecord>, DecodeError> {
    let mut reader = Reader::from_str(text);
    let mut records = Vec::new();
    let mut ids = HashSet::new();

    let mut saw_root = false;
    let mut in_root = false;
    let mut mark: Option<MarkFields> = None;
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = element_name(&e)?;
                if let Some(open) = field {
                    return Err(DecodeError::Malformed(format!(
                        "unexpected <{}> inside <{}>",
                        name, open
                    )));
                } else if let Some(fields) = mark.as_mut() {
                    match known_field(&name) {
                        Some(known) => {
                            fields.values.insert(known, String::new());
                            field = Some(known);
                        }
                        None => skip(&mut reader, &e)?,
                    }
                } else if in_root {
                    if name == MARK_TAG {
                        mark = Some(MarkFields::start(records.len() + 1, &e)?);
                    } else {
                        skip(&mut reader, &e)?;
                    }
                } else if !saw_root && name == ROOT_TAG {
                    saw_root = true;
                    in_root = true;
                } else {
                    return Err(unexpected_element(&name));
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e)?;
                if let Some(open) = field {
                    return Err(DecodeError::Malformed(format!(
                        "unexpected <{}/> inside <{}>",
                        name, open
                    )));
                } else if let Some(fields) = mark.as_mut() {
                    if let Some(known) = known_field(&name) {
                        fields.values.insert(known, String::new());
                    }
                } else if in_root {
                    if name == MARK_TAG {
                        let fields = MarkFields::start(records.len() + 1, &e)?;
                        push_record(&mut records, &mut ids, fields.finish()?)?;
                    }
                } else if !saw_root && name == ROOT_TAG {
                    saw_root = true;
                } else {
                    return Err(unexpected_element(&name));
                }
            }
            Event::Text(t) => {
                if let (Some(fields), Some(open)) = (mark.as_mut(), field) {
                    let text = t.unescape().map_err(malformed)?;
                    fields.append(open, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(fields), Some(open)) = (mark.as_mut(), field) {
                    let text = c.decode().map_err(malformed)?;
                    fields.append(open, &text);
                }
            }
            Event::End(_) => {
                if field.is_some() {
                    field = None;
                } else if let Some(fields) = mark.take() {
                    push_record(&mut records, &mut ids, fields.finish()?)?;
                } else if in_root {
                    in_root = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if in_root || mark.is_some() {
        return Err(DecodeError::Malformed(
            "unexpected end of document".to_string(),
        ));
    }
    if !saw_root {
        return Err(DecodeError::Malformed(format!(
            "missing <{}> root element",
            ROOT_TAG
        )));
    }

    Ok(records)
}

fn element_name(e: &BytesStart<'_>) -> std::result::Result<String, DecodeError> {
    std::str::from_utf8(e.name().as_ref())
        .map(str::to_string)
        .map_err(malformed)
}

fn known_field(name: &str) -> Option<&'static str> {
    FIELDS.into_iter().find(|f| *f == name)
}

fn unexpected_element(name: &str) -> DecodeError {
    DecodeError::Malformed(format!("unexpected element <{}>", name))
}

/// Skip an element this codec does not know, with all of its content
fn skip(reader: &mut Reader<&[u8]>, e: &BytesStart<'_>) -> std::result::Result<(), DecodeError> {
    let name = e.name().as_ref().to_vec();
    reader.read_to_end(QName(&name)).map_err(malformed)?;
    Ok(())
}

fn push_record(
    records: &mut Vec<MarkerRecord>,
    ids: &mut HashSet<u32>,
    record: MarkerRecord,
) -> std::result::Result<(), DecodeError> {
    if !ids.insert(record.index) {
        return Err(DecodeError::Malformed(format!(
            "duplicate mark id {}",
            record.index
        )));
    }
    records.push(record);
    Ok(())
}

/// Raw child values of one `<Mark>` element
struct MarkFields {
    /// 1-based position in the document, for error messages
    ordinal: usize,
    id: u32,
    values: HashMap<&'static str, String>,
}

impl MarkFields {
    fn start(ordinal: usize, e: &BytesStart<'_>) -> std::result::Result<Self, DecodeError> {
        let invalid = |value: String| DecodeError::InvalidIndex {
            mark: ordinal,
            value,
        };

        let raw = match e.try_get_attribute(ID_ATTR).map_err(malformed)? {
            Some(attr) => attr.unescape_value().map_err(malformed)?.into_owned(),
            None => return Err(invalid(String::new())),
        };
        let parsed = raw.trim().parse::<u32>();
        let id = match parsed {
            Ok(id) if id > 0 => id,
            _ => return Err(invalid(raw)),
        };

        Ok(Self {
            ordinal,
            id,
            values: HashMap::new(),
        })
    }

    fn append(&mut self, field: &'static str, text: &str) {
        self.values.entry(field).or_default().push_str(text);
    }

    fn text(&self, field: &'static str) -> std::result::Result<&str, DecodeError> {
        self.values
            .get(field)
            .map(String::as_str)
            .ok_or(DecodeError::MissingField {
                mark: self.ordinal,
                field,
            })
    }

    fn number(&self, field: &'static str) -> std::result::Result<f64, DecodeError> {
        let value = self.text(field)?;
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeError::InvalidNumber {
                mark: self.ordinal,
                field,
                value: value.to_string(),
            })
    }

    fn finish(self) -> std::result::Result<MarkerRecord, DecodeError> {
        let label = self.text(LABEL)?;
        if label.is_empty() {
            return Err(DecodeError::MissingField {
                mark: self.ordinal,
                field: LABEL,
            });
        }

        let timestamp = self.text(TIMESTAMP)?;
        let timestamp_millis = time::parse_utc_millis(timestamp)
            .ok_or_else(|| DecodeError::InvalidTimestamp(timestamp.to_string()))?;

        let image = self.text(IMAGE)?.trim();
        let image_path = (!image.is_empty()).then(|| image.to_string());

        Ok(MarkerRecord {
            index: self.id,
            label: label.to_string(),
            timestamp_millis,
            latitude_deg: self.number(LAT)?,
            longitude_deg: self.number(LON)?,
            image_path,
            draw_path: DrawPath::from_text(self.text(DRAW)?.trim()),
            annotation: self.text(ANNOTATION)?.to_string(),
            altitude_m: self.number(ALTITUDE)?,
            depth_m: self.number(DEPTH)?,
            range_m: self.number(RANGE)?,
            height_m: self.number(HEIGHT)?,
            classification: self.text(CLASSIFICATION)?.trim().parse::<Classification>()?,
        })
    }
}
