//! Typed validation of fetched manifests.
//!
//! Each `from_json` either yields a fully populated manifest or every
//! field problem it found, so a rejected entity can be logged with the
//! complete reason.

use std::fmt;

use serde_json::{Map, Value};

pub const GLTF_MIME_TYPES: [&str; 2] = ["model/gltf-binary", "model/gltf+json"];
pub const IMAGE_MIME_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    GLTF_MIME_TYPES.contains(&mime_type) || IMAGE_MIME_TYPES.contains(&mime_type)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    NotAnObject,
    Missing(String),
    WrongType { field: String, expected: &'static str },
    /// No entry of `formats` has a `uri` equal to `artifactUri`.
    ArtifactFormatMissing,
    UnsupportedMimeType(String),
    Dimensions(String),
    Coordinates(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::NotAnObject => f.write_str("manifest is not a JSON object"),
            FieldError::Missing(field) => write!(f, "missing required field `{field}`"),
            FieldError::WrongType { field, expected } => write!(f, "`{field}` is not {expected}"),
            FieldError::ArtifactFormatMissing => f.write_str("formats do not include the artifact"),
            FieldError::UnsupportedMimeType(mime) => write!(f, "unsupported mime type `{mime}`"),
            FieldError::Dimensions(reason) => write!(f, "invalid dimensions: {reason}"),
            FieldError::Coordinates(reason) => write!(f, "invalid coordinates: {reason}"),
        }
    }
}

/// Every field problem found in one manifest. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestErrors(Vec<FieldError>);

impl ManifestErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn contains(&self, error: &FieldError) -> bool {
        self.0.contains(error)
    }
}

impl fmt::Display for ManifestErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ManifestErrors {}

/// Field reader that records problems instead of stopping at the first.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    prefix: &'static str,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn new(value: &'a Value) -> Result<Self, ManifestErrors> {
        match value.as_object() {
            Some(object) => Ok(Self::nested(object, "")),
            None => Err(ManifestErrors(vec![FieldError::NotAnObject])),
        }
    }

    fn nested(object: &'a Map<String, Value>, prefix: &'static str) -> Self {
        Self {
            object,
            prefix,
            errors: Vec::new(),
        }
    }

    fn name(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    /// Present and not null.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    fn required(&mut self, field: &str) -> Option<&'a Value> {
        let value = self.get(field);
        if value.is_none() {
            self.errors.push(FieldError::Missing(self.name(field)));
        }
        value
    }

    fn wrong_type(&mut self, field: &str, expected: &'static str) {
        self.errors.push(FieldError::WrongType {
            field: self.name(field),
            expected,
        });
    }

    fn typed<T>(&mut self, field: &str, value: Option<&'a Value>, expected: &'static str, f: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
        let value = value?;
        let out = f(value);
        if out.is_none() {
            self.wrong_type(field, expected);
        }
        out
    }

    fn required_str(&mut self, field: &str) -> Option<String> {
        let value = self.required(field);
        self.typed(field, value, "a string", |v| v.as_str().map(str::to_string))
    }

    fn optional_str(&mut self, field: &str) -> Option<String> {
        let value = self.get(field);
        self.typed(field, value, "a string", |v| v.as_str().map(str::to_string))
    }

    fn required_u64(&mut self, field: &str) -> Option<u64> {
        let value = self.required(field);
        self.typed(field, value, "a non-negative integer", Value::as_u64)
    }

    fn required_f64(&mut self, field: &str) -> Option<f64> {
        let value = self.required(field);
        self.typed(field, value, "a number", Value::as_f64)
    }

    fn tags(&mut self) -> Vec<String> {
        let Some(value) = self.get("tags") else {
            return Vec::new();
        };
        let Some(entries) = value.as_array() else {
            self.wrong_type("tags", "an array of strings");
            return Vec::new();
        };
        let mut raw = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.as_str() {
                Some(s) => raw.push(s),
                None => {
                    self.wrong_type("tags", "an array of strings");
                    return Vec::new();
                }
            }
        }
        normalize_tags(raw)
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ManifestErrors> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(ManifestErrors(self.errors)),
        }
    }
}

/// Splits every entry on commas, trims, lower-cases and drops empty and
/// repeated names, keeping first-seen order.
pub fn normalize_tags<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for entry in raw {
        for split in entry.split(',') {
            let tag = split.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }
    tags
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Parses `{"value": "<w>x<h>", "unit": "px"}`.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let unit = value.get("unit").and_then(Value::as_str).ok_or("missing unit")?;
        if unit != "px" {
            return Err(format!("unit is `{unit}`, expected `px`"));
        }
        let raw = value.get("value").and_then(Value::as_str).ok_or("missing value")?;
        let parts: Vec<&str> = raw.split('x').collect();
        let [w, h] = parts.as_slice() else {
            return Err(format!("expected `<w>x<h>`, got `{raw}`"));
        };
        let width = w.trim().parse().map_err(|_| format!("bad width `{w}`"))?;
        let height = h.trim().parse().map_err(|_| format!("bad height `{h}`"))?;
        Ok(Self { width, height })
    }
}

/// The `formats` entry describing the artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactFormat {
    pub mime_type: String,
    pub file_size: u64,
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemManifest {
    pub name: String,
    pub description: String,
    pub artifact_uri: String,
    pub thumbnail_uri: Option<String>,
    pub display_uri: Option<String>,
    pub polygon_count: u64,
    pub base_scale: f64,
    pub format: ArtifactFormat,
    pub image_frame: Option<Value>,
    pub tags: Vec<String>,
}

impl ItemManifest {
    pub fn from_json(value: &Value) -> Result<Self, ManifestErrors> {
        let mut fields = Fields::new(value)?;

        let polygon_count = fields.required_u64("polygonCount");
        let base_scale = fields.required_f64("baseScale");
        let artifact_uri = fields.required_str("artifactUri");
        let name = fields.optional_str("name").unwrap_or_default();
        let description = fields.optional_str("description").unwrap_or_default();
        let thumbnail_uri = fields.optional_str("thumbnailUri");
        let display_uri = fields.optional_str("displayUri");
        let tags = fields.tags();

        let format = artifact_uri
            .as_deref()
            .and_then(|uri| artifact_format(&mut fields, uri));

        let mut image_frame = None;
        if let Some(format) = &format {
            if IMAGE_MIME_TYPES.contains(&format.mime_type.as_str()) {
                if format.dimensions.is_none() {
                    fields
                        .errors
                        .push(FieldError::Dimensions("image artifacts need width and height".into()));
                }
                image_frame = fields.required("imageFrame").cloned();
            }
        }

        let manifest = match (polygon_count, base_scale, artifact_uri, format) {
            (Some(polygon_count), Some(base_scale), Some(artifact_uri), Some(format)) => Some(Self {
                name,
                description,
                artifact_uri,
                thumbnail_uri,
                display_uri,
                polygon_count,
                base_scale,
                format,
                image_frame,
                tags,
            }),
            _ => None,
        };
        fields.finish(manifest)
    }

    pub fn is_gltf(&self) -> bool {
        GLTF_MIME_TYPES.contains(&self.format.mime_type.as_str())
    }
}

fn artifact_format(fields: &mut Fields<'_>, artifact_uri: &str) -> Option<ArtifactFormat> {
    let value = fields.required("formats")?;
    let Some(formats) = value.as_array() else {
        fields.wrong_type("formats", "an array");
        return None;
    };

    let entry = formats
        .iter()
        .filter_map(Value::as_object)
        .find(|f| f.get("uri").and_then(Value::as_str) == Some(artifact_uri));
    let Some(entry) = entry else {
        fields.errors.push(FieldError::ArtifactFormatMissing);
        return None;
    };

    let mut format = Fields::nested(entry, "formats.");
    let mime_type = format.required_str("mimeType");
    let file_size = format.required_u64("fileSize");
    let dimensions = match format.get("dimensions") {
        Some(value) => match Dimensions::from_json(value) {
            Ok(d) => Some(d),
            Err(reason) => {
                format.errors.push(FieldError::Dimensions(reason));
                None
            }
        },
        None => None,
    };
    if let Some(mime) = &mime_type {
        if !is_allowed_mime_type(mime) {
            format.errors.push(FieldError::UnsupportedMimeType(mime.clone()));
        }
    }
    fields.errors.append(&mut format.errors);

    Some(ArtifactFormat {
        mime_type: mime_type?,
        file_size: file_size?,
        dimensions,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub place_type: String,
    pub build_height: f64,
    pub center_coordinates: Vec<f64>,
    pub border_coordinates: Value,
}

impl PlaceManifest {
    pub fn from_json(value: &Value) -> Result<Self, ManifestErrors> {
        let mut fields = Fields::new(value)?;

        let place_type = fields.required_str("placeType");
        let border_coordinates = fields.required("borderCoordinates").cloned();
        let center_coordinates = fields.required("centerCoordinates").and_then(|v| {
            match parse_center(v) {
                Ok(center) => Some(center),
                Err(reason) => {
                    fields.errors.push(FieldError::Coordinates(reason));
                    None
                }
            }
        });
        let build_height = fields.required_f64("buildHeight");
        let name = fields.optional_str("name");
        let description = fields.optional_str("description");

        let manifest = match (place_type, build_height, center_coordinates, border_coordinates) {
            (Some(place_type), Some(build_height), Some(center_coordinates), Some(border_coordinates)) => {
                Some(Self {
                    name,
                    description,
                    place_type,
                    build_height,
                    center_coordinates,
                    border_coordinates,
                })
            }
            _ => None,
        };
        fields.finish(manifest)
    }

    pub fn center(&self) -> (f64, f64, f64) {
        (
            self.center_coordinates[0],
            self.center_coordinates[1],
            self.center_coordinates[2],
        )
    }
}

fn parse_center(value: &Value) -> Result<Vec<f64>, String> {
    let array = value.as_array().ok_or("centerCoordinates is not an array")?;
    let center = array
        .iter()
        .map(Value::as_f64)
        .collect::<Option<Vec<f64>>>()
        .ok_or("centerCoordinates contains a non-number")?;
    if center.len() < 3 {
        return Err(format!("centerCoordinates has {} values, need 3", center.len()));
    }
    Ok(center)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractManifest {
    pub name: String,
    pub description: String,
    pub user_description: Option<String>,
    pub tags: Vec<String>,
}

impl ContractManifest {
    pub fn from_json(value: &Value) -> Result<Self, ManifestErrors> {
        let mut fields = Fields::new(value)?;

        let name = fields.required_str("name");
        let description = fields.required_str("description");
        let user_description = fields.optional_str("userDescription");
        let tags = fields.tags();

        let manifest = match (name, description) {
            (Some(name), Some(description)) => Some(Self {
                name,
                description,
                user_description,
                tags,
            }),
            _ => None,
        };
        fields.finish(manifest)
    }
}
