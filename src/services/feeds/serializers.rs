use serde_json::Value;

use crate::errors::ServiceError;
use crate::services::feeds::formatters::{FeedPlatform, PlatformRecord};

const GOOGLE_NAMESPACE: &str = "http://base.google.com/ns/1.0";

/// Supported output encodings for a feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FeedFormat {
    Json,
    Csv,
    Xml,
}

impl FeedFormat {
    /// Parse a stored format name. Unknown names are a configuration error.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        raw.to_lowercase()
            .parse::<FeedFormat>()
            .map_err(|_| ServiceError::ConfigurationError(format!("unknown feed format: {raw}")))
    }

    pub fn content_type(self) -> &'static str {
        match self {
            FeedFormat::Json => "application/json; charset=utf-8",
            FeedFormat::Csv => "text/csv; charset=utf-8",
            FeedFormat::Xml => "application/xml; charset=utf-8",
        }
    }
}

/// Channel-level metadata for the RSS wrapper Google expects.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// Render records in the requested format. Record order is preserved in all
/// three encodings.
pub fn serialize_records(
    format: FeedFormat,
    platform: FeedPlatform,
    records: &[PlatformRecord],
    channel: &ChannelInfo,
) -> Result<String, ServiceError> {
    match format {
        FeedFormat::Json => to_json(records),
        FeedFormat::Csv => Ok(to_csv(records)),
        FeedFormat::Xml => Ok(to_xml(platform, records, channel)),
    }
}

/// Pretty-printed JSON, 2-space indent, array at the top level.
pub fn to_json(records: &[PlatformRecord]) -> Result<String, ServiceError> {
    serde_json::to_string_pretty(records)
        .map_err(|e| ServiceError::GenerationError(format!("JSON serialization failed: {e}")))
}

/// CSV with the header row taken from the first record (one platform's
/// records share a schema). Every field is double-quote-wrapped with inner
/// quotes doubled; list values are joined with `|` before quoting.
pub fn to_csv(records: &[PlatformRecord]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let headers: Vec<&String> = first.keys().collect();
    let mut lines = Vec::with_capacity(records.len() + 1);

    lines.push(
        headers
            .iter()
            .map(|h| quote_csv(h))
            .collect::<Vec<_>>()
            .join(","),
    );

    for record in records {
        let row = headers
            .iter()
            .map(|h| {
                let value = record.get(*h).unwrap_or(&Value::Null);
                quote_csv(&value_to_text(value))
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    lines.join("\n")
}

fn quote_csv(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// XML document. Google gets the RSS 2.0 channel wrapper with a `g:`
/// namespace per field; every other platform gets the flat
/// `<products><product>` structure. Every field value sits inside CDATA and
/// empty fields are omitted entirely.
pub fn to_xml(platform: FeedPlatform, records: &[PlatformRecord], channel: &ChannelInfo) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    if platform == FeedPlatform::Google {
        out.push_str(&format!(
            "<rss version=\"2.0\" xmlns:g=\"{}\">\n",
            GOOGLE_NAMESPACE
        ));
        out.push_str("  <channel>\n");
        out.push_str(&format!("    <title>{}</title>\n", cdata(&channel.title)));
        out.push_str(&format!("    <link>{}</link>\n", cdata(&channel.link)));
        out.push_str(&format!(
            "    <description>{}</description>\n",
            cdata(&channel.description)
        ));
        for record in records {
            out.push_str("    <item>\n");
            for (key, value) in record {
                if is_empty_value(value) {
                    continue;
                }
                out.push_str(&format!(
                    "      <g:{key}>{}</g:{key}>\n",
                    cdata(&value_to_text(value))
                ));
            }
            out.push_str("    </item>\n");
        }
        out.push_str("  </channel>\n");
        out.push_str("</rss>\n");
    } else {
        out.push_str("<products>\n");
        for record in records {
            out.push_str("  <product>\n");
            for (key, value) in record {
                if is_empty_value(value) {
                    continue;
                }
                out.push_str(&format!(
                    "    <{key}>{}</{key}>\n",
                    cdata(&value_to_text(value))
                ));
            }
            out.push_str("  </product>\n");
        }
        out.push_str("</products>\n");
    }

    out
}

/// Wrap in CDATA. A literal `]]>` inside the value would close the section
/// early, so it is split across two adjacent sections.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("|"),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
