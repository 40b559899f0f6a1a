//! Local shapes for Moodle records
//!
//! Moodle payloads are open JSON objects whose fields vary by version and
//! site configuration. These types pick out what the API serves and tolerate
//! the rest; a record that cannot be mapped is skipped by [`map_records`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A course as listed to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: i64,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub shortname: String,
    /// `category` in enrolment listings, `categoryid` elsewhere
    #[serde(default, alias = "category")]
    pub categoryid: i64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summaryformat: Option<i64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub showgrades: Option<bool>,
    #[serde(default)]
    pub newsitems: Option<i64>,
    #[serde(default)]
    pub startdate: Option<i64>,
    #[serde(default)]
    pub enddate: Option<i64>,
    #[serde(default)]
    pub maxbytes: Option<i64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub showreports: Option<bool>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub visible: Option<bool>,
    #[serde(default)]
    pub groupmode: Option<i64>,
    #[serde(default)]
    pub groupmodeforce: Option<i64>,
    #[serde(default)]
    pub defaultgroupingid: Option<i64>,
}

/// One section of a course's content tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseSection {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub visible: Option<bool>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summaryformat: Option<i64>,
    #[serde(default)]
    pub section: Option<i64>,
    #[serde(default)]
    pub hiddenbynumsections: Option<i64>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub uservisible: Option<bool>,
    /// Activity modules, passed through untouched
    #[serde(default)]
    pub modules: Vec<Value>,
}

/// A downloadable file found in a course
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CourseFile {
    /// `{module id}-{position in the module's contents}`
    pub file_id: String,
    pub filename: Option<String>,
    pub fileurl: Option<String>,
    pub filesize: Option<i64>,
    pub mimetype: Option<String>,
    pub module_name: Option<String>,
    pub section_name: Option<String>,
}

/// Map raw records into `T`, logging and dropping the ones that don't fit
pub fn map_records<T: DeserializeOwned>(records: Vec<Value>, kind: &str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<T>(record) {
            Ok(mapped) => Some(mapped),
            Err(e) => {
                tracing::warn!("Could not parse {} data: {}", kind, e);
                None
            }
        })
        .collect()
}

/// Every file-type content item under the given sections.
///
/// With `file_type`, only files whose extension matches (case-insensitive)
/// are kept.
pub fn course_files(sections: &[Value], file_type: Option<&str>) -> Vec<CourseFile> {
    let wanted = file_type.map(str::to_lowercase);
    let mut files = Vec::new();

    for section in sections {
        for module in array(section, "modules") {
            let module_id = module.get("id").and_then(Value::as_i64).unwrap_or_default();

            for (index, content) in array(module, "contents").iter().enumerate() {
                if content.get("type").and_then(Value::as_str) != Some("file") {
                    continue;
                }

                let filename = string(content, "filename");
                if let Some(wanted) = &wanted {
                    let extension = filename
                        .as_deref()
                        .and_then(|name| name.rsplit('.').next())
                        .unwrap_or_default()
                        .to_lowercase();
                    if &extension != wanted {
                        continue;
                    }
                }

                files.push(CourseFile {
                    file_id: format!("{}-{}", module_id, index),
                    filename,
                    fileurl: string(content, "fileurl"),
                    filesize: content.get("filesize").and_then(Value::as_i64),
                    mimetype: string(content, "mimetype"),
                    module_name: string(module, "name"),
                    section_name: string(section, "name"),
                });
            }
        }
    }

    files
}

/// Look up one file by the id [`course_files`] assigned it
pub fn find_course_file(sections: &[Value], file_id: &str) -> Option<CourseFile> {
    course_files(sections, None)
        .into_iter()
        .find(|file| file.file_id == file_id)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Moodle sends flags as booleans, 0/1 integers or "0"/"1" strings
fn flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        Some(Value::String(s)) => match s.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
